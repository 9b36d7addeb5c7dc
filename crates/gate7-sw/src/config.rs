//! Worker configuration.
//!
//! Everything that used to be a top-level constant of the browser worker
//! (cache version, asset manifest, CDN allow-list, timeout) lives here and is
//! handed to the controller at construction.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::{Result, SwError};

/// Offline worker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// The site origin the worker controls.
    pub origin: Url,

    /// Current cache version. Bump it on every deploy that should invalidate
    /// previously cached assets.
    pub cache_name: String,

    /// Paths pre-cached at install time, in order.
    pub manifest: Vec<String>,

    /// Host substrings that are never intercepted.
    pub cdn_hosts: Vec<String>,

    /// Network budget for network-first requests, in milliseconds.
    pub network_timeout_ms: u64,

    /// Cached page served to navigations when offline.
    pub offline_page: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_name: "gate7-v3".to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect(),
            cdn_hosts: DEFAULT_CDN_HOSTS.iter().map(|h| h.to_string()).collect(),
            network_timeout_ms: 3000,
            offline_page: "/index.html".to_string(),
        }
    }
}

const DEFAULT_MANIFEST: &[&str] = &[
    "/",
    "/index.html",
    "/menu/index.html",
    "/hiring/index.html",
    "/pilot/index.html",
    "/brand-story/index.html",
    "/css/style-gate7.css",
    "/css/style-menu.css",
    "/css/style-music.css",
    "/css/style-footer.css",
    "/css/style-global.css",
    "/css/style-index.css",
    "/js/language-switcher.js",
    "/js/scroll-animations.js",
    "/js/responsive-images.js",
    "/images/logo-color-black-bg1.png",
    "/images/logo-only-white.png",
    "/images/logo-only-black.png",
    "/images/coffee-as-you-are.png",
    "/images/coffee-as-you-are-light-gold.png",
    "/images/social-icon-instagram.png",
    "/images/social-icon-facebook.png",
    "/images/social-icon-zalo.png",
    "/images/logo.png",
    "/images/header.png",
];

const DEFAULT_CDN_HOSTS: &[&str] = &["cdn.jsdelivr.net", "raw.githubusercontent.com", "cloudflare"];

fn default_origin() -> Url {
    Url::parse("https://gate7.vn/").expect("default origin is a valid URL")
}

impl OfflineConfig {
    /// Configuration for `origin` with an explicit version and manifest.
    pub fn new(origin: Url, cache_name: impl Into<String>, manifest: Vec<String>) -> Self {
        Self {
            origin,
            cache_name: cache_name.into(),
            manifest,
            ..Default::default()
        }
    }

    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SwError::storage(path, e))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        debug!(path = %path.display(), cache = %config.cache_name, "Loaded worker config");
        Ok(config)
    }

    /// Reject configurations the worker cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(SwError::config(format!(
                "origin must be http(s), got '{}'",
                self.origin
            )));
        }
        if self.cache_name.trim().is_empty() {
            return Err(SwError::config("cache_name must not be empty"));
        }
        if self.network_timeout_ms == 0 {
            return Err(SwError::config("network_timeout_ms must be positive"));
        }
        if !self.offline_page.starts_with('/') {
            return Err(SwError::config(format!(
                "offline_page '{}' must be an absolute path",
                self.offline_page
            )));
        }
        if let Some(bad) = self.manifest.iter().find(|p| !p.starts_with('/')) {
            return Err(SwError::config(format!(
                "manifest entry '{}' must be an absolute path",
                bad
            )));
        }
        Ok(())
    }

    /// Network budget for network-first requests.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// Resolve an absolute path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| SwError::config(format!("cannot resolve '{}': {}", path, e)))
    }

    /// URL of the cached offline page.
    pub fn offline_page_url(&self) -> Result<Url> {
        self.resolve(&self.offline_page)
    }

    /// Whether `url` belongs to the controlled origin.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin.origin()
    }

    /// Whether `url` targets an allow-listed CDN host.
    pub fn is_cdn(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        self.cdn_hosts
            .iter()
            .any(|fragment| !fragment.is_empty() && host.contains(fragment.as_str()))
    }
}
