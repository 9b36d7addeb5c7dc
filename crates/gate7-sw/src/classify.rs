//! Request classification.
//!
//! Decided synchronously, before any cache or network I/O. Rules are checked
//! in order and the first match wins.

use std::fmt;

use gate7_net::{Destination, Request};
use http::Method;

use crate::config::OfflineConfig;

/// Why a request is left to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Only GET requests are intercepted.
    NonGet,
    /// The host is on the CDN allow-list.
    Cdn,
    /// Some other origin.
    CrossOrigin,
    /// The worker is not active yet, or the page is not one it controls.
    /// Decided by the host, never by [`classify`].
    NotControlled,
}

/// How the worker handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Not intercepted; default network handling applies.
    Ignore(IgnoreReason),
    /// Cache, then network on a miss. Images and fonts.
    CacheFirst,
    /// Network raced against the timeout, then cache, then a fallback.
    NetworkFirst(Destination),
}

impl Disposition {
    pub fn is_intercepted(&self) -> bool {
        !matches!(self, Disposition::Ignore(_))
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Ignore(IgnoreReason::NonGet) => f.write_str("ignore:non-get"),
            Disposition::Ignore(IgnoreReason::Cdn) => f.write_str("ignore:cdn"),
            Disposition::Ignore(IgnoreReason::CrossOrigin) => f.write_str("ignore:cross-origin"),
            Disposition::Ignore(IgnoreReason::NotControlled) => {
                f.write_str("ignore:not-controlled")
            }
            Disposition::CacheFirst => f.write_str("cache-first"),
            Disposition::NetworkFirst(dest) => write!(f, "network-first:{}", dest),
        }
    }
}

/// Classify `request` under `config`.
pub fn classify(request: &Request, config: &OfflineConfig) -> Disposition {
    if request.method != Method::GET {
        return Disposition::Ignore(IgnoreReason::NonGet);
    }
    if config.is_cdn(&request.url) {
        return Disposition::Ignore(IgnoreReason::Cdn);
    }
    if !config.is_same_origin(&request.url) {
        return Disposition::Ignore(IgnoreReason::CrossOrigin);
    }

    let destination = request.resource_type();
    if destination.is_media() {
        Disposition::CacheFirst
    } else {
        Disposition::NetworkFirst(destination)
    }
}
