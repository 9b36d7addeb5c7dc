//! # Gate7 Offline Cache Controller
//!
//! The service worker behind gate7.vn, expressed as a plain async Rust
//! controller that a host drives through four entry points.
//!
//! ## Features
//!
//! - **Lifecycle**: install pre-caches the asset manifest, activate deletes
//!   stale cache versions and claims clients
//! - **Fetch strategies**: passthrough, cache-first for media,
//!   network-first with a timeout for everything else
//! - **Fallbacks**: every failure resolves to a cached or synthesized response
//! - **Persistence**: cache versions snapshot to disk between runs
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerHost (event bridge)
//!     │  HostEvent::{Install, Activate, Fetch, Message, ClientOpened}
//!     ▼
//! OfflineCacheController
//!     ├── OfflineConfig (origin, cache version, manifest, CDN list)
//!     ├── Fetcher (network)
//!     └── CacheStorage
//!             └── Cache (one per version)
//!                     └── URL → CacheEntry
//! ```

use std::path::PathBuf;

use gate7_common::Gate7Error;
use gate7_net::NetError;
use thiserror::Error;

pub mod cache;
pub mod classify;
pub mod config;
pub mod controller;
pub mod fallback;
pub mod host;
pub mod lifecycle;
pub mod persist;
pub mod response;

pub use cache::{cache_key, Cache, CacheEntry, CacheStorage};
pub use classify::{classify, Disposition, IgnoreReason};
pub use config::OfflineConfig;
pub use controller::{ActivateReport, FetchOutcome, InstallReport, OfflineCacheController};
pub use host::{FetchEvent, HostEvent, HostHandle, ServiceWorkerEvent, ServiceWorkerHost};
pub use lifecycle::{Client, Clients, ServiceWorkerState, WorkerMessage};
pub use response::{FetchResponse, ResponseSource};

// ==================== Errors ====================

/// Errors that can occur in offline worker operations.
#[derive(Error, Debug)]
pub enum SwError {
    #[error("Network error: {0}")]
    Network(#[from] NetError),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] Gate7Error),
}

impl SwError {
    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state error.
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a storage error for `path`.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Short, stable name for the `category` log field.
    pub fn category(&self) -> &'static str {
        match self {
            SwError::Network(_) => "network",
            SwError::Cache(_) => "cache",
            SwError::Config(_) => "config",
            SwError::State(_) => "state",
            SwError::Storage { .. } => "storage",
            SwError::Serialization(_) => "serialization",
            SwError::Common(e) => e.category(),
        }
    }
}

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, SwError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_categories() {
        let timeout = SwError::from(Gate7Error::Timeout(Duration::from_millis(3000)));
        assert_eq!(timeout.category(), "timeout");
        assert_eq!(timeout.to_string(), "Operation timed out after 3s");
        assert_eq!(
            SwError::Network(NetError::RequestFailed("dns".into())).category(),
            "network"
        );
        assert_eq!(SwError::cache("quota").category(), "cache");
    }

    #[test]
    fn test_storage_error_message() {
        let err = SwError::storage(
            "/tmp/gate7/gate7-v3.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "Storage error at /tmp/gate7/gate7-v3.json: denied"
        );
    }
}
