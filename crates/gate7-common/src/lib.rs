//! # Gate7 Common
//!
//! Error types, logging configuration, and timeout combinators shared by the
//! Gate7 offline worker crates.
//!
//! ## Features
//!
//! - A small error enum for timeouts and bad arguments
//! - `tracing` subscriber setup (pretty, compact, or JSON output)
//! - First-to-settle racing of a future against a timer

use std::time::Duration;
use thiserror::Error;

pub mod logging;
pub mod race;

pub use logging::{init_logging, LogConfig, LogFormat};
pub use race::{first_to_settle, with_timeout, Settled};

/// Cross-cutting errors shared by the Gate7 crates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Gate7Error {
    /// A raced operation lost to its timer.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Gate7Error {
    /// Short, stable name for the `category` log field.
    pub fn category(&self) -> &'static str {
        match self {
            Gate7Error::Timeout(_) => "timeout",
            Gate7Error::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Result type alias for shared operations.
pub type Result<T> = std::result::Result<T, Gate7Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Gate7Error::Timeout(Duration::from_millis(3000)).category(),
            "timeout"
        );
        assert_eq!(
            Gate7Error::InvalidArgument("xml".into()).category(),
            "invalid_argument"
        );
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            Gate7Error::Timeout(Duration::from_millis(3000)).to_string(),
            "Operation timed out after 3s"
        );
    }
}
