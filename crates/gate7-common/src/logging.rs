//! Logging configuration and setup.
//!
//! Logs go to stderr so a host's own output on stdout stays machine-readable.
//! Gate7 crates log at the configured level; everything else (reqwest, hyper,
//! rustls) is held at `warn` unless `RUST_LOG` or a custom filter says
//! otherwise.

use std::io::{self, IsTerminal};
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::Gate7Error;

/// Crates whose events follow [`LogConfig::level`].
const GATE7_TARGETS: &[&str] = &["gate7_common", "gate7_net", "gate7_sw", "gate7_offline"];

/// Level for every other target.
const DEPENDENCY_LEVEL: &str = "warn";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable.
    Pretty,
    /// One line per event.
    #[default]
    Compact,
    /// One JSON object per event, fields flattened.
    Json,
}

impl FromStr for LogFormat {
    type Err = Gate7Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(Gate7Error::InvalidArgument(format!(
                "unknown log format '{}' (expected pretty, compact or json)",
                other
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level for the Gate7 crates.
    pub level: Level,
    pub format: LogFormat,
    /// Include source file and line (pretty format only).
    pub include_location: bool,
    /// Log span enter/close, useful for following one fetch through the
    /// strategies.
    pub include_span_events: bool,
    /// Colored output. Ignored for JSON.
    pub ansi: bool,
    /// Filter directives replacing the defaults, e.g. `gate7_sw=trace,reqwest=debug`.
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Compact,
            include_location: false,
            include_span_events: false,
            ansi: io::stderr().is_terminal(),
            filter: None,
        }
    }
}

impl LogConfig {
    /// Debug level for the Gate7 crates, with locations and span events.
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            include_location: true,
            include_span_events: true,
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Replace the default directives.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Default filter directives: dependencies at `warn`, Gate7 crates at
    /// [`level`](Self::level).
    pub fn directives(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        let mut directives = vec![DEPENDENCY_LEVEL.to_string()];
        directives.extend(
            GATE7_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, level)),
        );
        directives.join(",")
    }

    /// Custom filter first, then `RUST_LOG`, then [`directives`](Self::directives).
    /// A custom filter that does not parse is returned as the second element.
    fn env_filter(&self) -> (EnvFilter, Option<String>) {
        match &self.filter {
            Some(custom) => match EnvFilter::try_new(custom) {
                Ok(filter) => return (filter, None),
                Err(e) => return (EnvFilter::new(self.directives()), Some(e.to_string())),
            },
            None => {
                if let Ok(filter) = EnvFilter::try_from_default_env() {
                    return (filter, None);
                }
            }
        }
        (EnvFilter::new(self.directives()), None)
    }
}

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Initialize logging with the given configuration.
///
/// A subscriber that is already installed wins; later calls are no-ops.
pub fn init_logging(config: LogConfig) {
    let span_events = if config.include_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer: Box<dyn Layer<FilteredRegistry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(io::stderr)
            .with_ansi(config.ansi)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(io::stderr)
            .with_ansi(config.ansi)
            .with_target(true)
            .with_span_events(span_events)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(io::stderr)
            .with_span_events(span_events)
            .boxed(),
    };

    let (filter, rejected) = config.env_filter();
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
    if let Some(error) = rejected {
        tracing::warn!(filter = ?config.filter, %error, "Invalid log filter, using defaults");
    }
}
