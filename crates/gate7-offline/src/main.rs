//! Command-line host for the Gate7 offline cache controller.
//!
//! Each invocation loads the cache store, delivers one worker event, waits
//! for background cache writes, and saves the store again.
//!
//! ## Usage
//!
//! ```bash
//! # Pre-cache the asset manifest
//! gate7-offline install
//!
//! # Drop stale cache versions
//! gate7-offline activate
//!
//! # Run one request through the fetch strategies
//! gate7-offline fetch /images/logo.png
//! gate7-offline fetch /menu/ --destination document
//!
//! # Inspect the store
//! gate7-offline caches
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gate7_common::{init_logging, LogConfig, LogFormat};
use gate7_net::{Destination, LoaderConfig, Request, ResourceLoader, Url};
use gate7_sw::{persist, FetchOutcome, OfflineCacheController, OfflineConfig};
use http::Method;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "gate7-offline")]
#[command(about = "Offline cache controller for the Gate7 site")]
struct Cli {
    /// Worker configuration (JSON). Built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the cache store
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Log output format: pretty, compact or json
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    /// Log filter directives, e.g. "gate7_sw=trace,reqwest=debug"
    #[arg(long, global = true)]
    log_filter: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pre-cache the asset manifest into the current cache version
    Install,

    /// Delete every cache version except the current one
    Activate,

    /// Run one request through the fetch strategies
    Fetch {
        /// Absolute URL, or a path under the configured origin
        url: String,
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: Method,
        /// Resource type (document, image, font, style, script, other).
        /// Inferred from the path when omitted.
        #[arg(short, long)]
        destination: Option<Destination>,
        /// Print the response body
        #[arg(long)]
        body: bool,
    },

    /// List stored cache versions
    Caches,

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = if cli.verbose {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    if let Some(filter) = &cli.log_filter {
        log_config = log_config.with_filter(filter.as_str());
    }
    init_logging(log_config.with_format(cli.log_format));

    let config = match &cli.config {
        Some(path) => OfflineConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OfflineConfig::default(),
    };
    let store = match cli.store {
        Some(dir) => dir,
        None => default_store()?,
    };
    debug!(store = %store.display(), cache = %config.cache_name, "Starting");

    match cli.command {
        Commands::Install => {
            let controller = open(config, &store).await?;
            let report = controller.on_install().await;
            finish(&controller, &store).await?;

            println!(
                "{}: cached {}, failed {}",
                report.cache_name,
                report.cached.len(),
                report.failed.len()
            );
            for path in &report.failed {
                println!("  failed: {}", path);
            }
        }

        Commands::Activate => {
            let controller = open(config, &store).await?;
            let report = controller.on_activate().await;
            finish(&controller, &store).await?;

            if report.deleted.is_empty() {
                println!("No stale caches");
            }
            for name in &report.deleted {
                println!("Deleted {}", name);
            }
        }

        Commands::Fetch {
            url,
            method,
            destination,
            body,
        } => {
            let url = resolve_target(&config, &url)?;
            let mut request = Request::new(method, url);
            request.destination = destination;

            let controller = open(config, &store).await?;
            let outcome = controller.on_fetch(request).await;
            finish(&controller, &store).await?;

            match outcome {
                FetchOutcome::Passthrough(reason) => {
                    println!("passthrough ({:?})", reason);
                }
                FetchOutcome::Respond(response) => {
                    println!(
                        "{} {} {} bytes via {:?}",
                        response.status,
                        response.content_type().unwrap_or("-"),
                        response.body.len(),
                        response.source
                    );
                    if body {
                        println!("{}", String::from_utf8_lossy(&response.body));
                    }
                }
            }
        }

        Commands::Caches => {
            let storage = persist::load(&store)
                .await
                .with_context(|| format!("loading cache store {}", store.display()))?;
            if storage.keys().is_empty() {
                println!("No caches in {}", store.display());
            }
            for name in storage.keys() {
                let entries = storage.get(name).map(|c| c.len()).unwrap_or_default();
                let marker = if name == config.cache_name { "*" } else { " " };
                println!("{} {} ({} entries)", marker, name, entries);
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn default_store() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join("gate7-offline"))
        .context("no platform cache directory; pass --store")
}

/// Absolute URLs are taken as-is, anything else is a path under the origin.
fn resolve_target(config: &OfflineConfig, target: &str) -> Result<Url> {
    match Url::parse(target) {
        Ok(url) => Ok(url),
        Err(_) => config
            .resolve(target)
            .with_context(|| format!("resolving '{}'", target)),
    }
}

async fn open(config: OfflineConfig, store: &Path) -> Result<OfflineCacheController> {
    let storage = persist::load(store)
        .await
        .with_context(|| format!("loading cache store {}", store.display()))?;
    let loader = ResourceLoader::new(LoaderConfig::default()).context("creating HTTP client")?;

    Ok(OfflineCacheController::with_storage(
        config,
        Arc::new(loader),
        storage,
    ))
}

async fn finish(controller: &OfflineCacheController, store: &Path) -> Result<()> {
    controller.settle().await;
    persist::save(store, &controller.snapshot().await)
        .await
        .with_context(|| format!("saving cache store {}", store.display()))?;
    info!(store = %store.display(), "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_fetch() {
        let cli = Cli::parse_from([
            "gate7-offline",
            "--store",
            "/tmp/gate7",
            "fetch",
            "/images/logo.png",
            "--destination",
            "image",
        ]);
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/gate7")));
        match cli.command {
            Commands::Fetch {
                url,
                method,
                destination,
                body,
            } => {
                assert_eq!(url, "/images/logo.png");
                assert_eq!(method, Method::GET);
                assert_eq!(destination, Some(Destination::Image));
                assert!(!body);
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_cli_log_format() {
        let cli = Cli::parse_from([
            "gate7-offline",
            "--log-format",
            "json",
            "--log-filter",
            "gate7_sw=trace",
            "caches",
        ]);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_filter.as_deref(), Some("gate7_sw=trace"));
        assert!(Cli::try_parse_from(["gate7-offline", "--log-format", "xml", "caches"]).is_err());
    }

    #[test]
    fn test_resolve_target() {
        let config = OfflineConfig::default();
        assert_eq!(
            resolve_target(&config, "/menu/").unwrap().as_str(),
            "https://gate7.vn/menu/"
        );
        assert_eq!(
            resolve_target(&config, "https://cdn.jsdelivr.net/x.js")
                .unwrap()
                .as_str(),
            "https://cdn.jsdelivr.net/x.js"
        );
    }
}
