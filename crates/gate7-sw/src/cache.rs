//! Cache API: named cache versions holding request → response entries.

use bytes::Bytes;
use gate7_net::Response;
use hashbrown::HashMap;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Result, SwError};

/// Cache key for `url`. Fragments never reach the network, so they are not
/// part of the key.
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

// ==================== Entry ====================

/// A cached request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request URL (the cache key).
    pub url: String,

    /// Request method.
    pub method: String,

    /// Response status.
    pub status: u16,

    /// Response headers in wire order. Repeated names keep every value.
    pub headers: Vec<(String, String)>,

    /// Response body.
    #[serde(with = "body_base64")]
    pub body: Bytes,

    /// Cached at timestamp (ms since epoch).
    pub cached_at: u64,
}

impl CacheEntry {
    /// Snapshot a network response for storage.
    pub fn from_response(response: &Response, request_url: &Url) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            url: cache_key(request_url),
            method: Method::GET.to_string(),
            status: response.status.as_u16(),
            headers,
            body: response.body.clone(),
            cached_at: now_millis(),
        }
    }

    /// Only successful GET responses may be stored.
    pub fn is_storable(&self) -> bool {
        self.method == Method::GET.as_str() && self.status == StatusCode::OK.as_u16()
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

mod body_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

// ==================== Cache ====================

/// One cache version.
#[derive(Debug, Clone, Default)]
pub struct Cache {
    /// Cache name.
    pub name: String,

    entries: HashMap<String, CacheEntry>,
}

impl Cache {
    /// Create a new cache.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: HashMap::new(),
        }
    }

    /// Match a request by key.
    pub fn match_request(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// Store an entry, overwriting any previous one for the same key.
    pub fn put(&mut self, entry: CacheEntry) -> Result<()> {
        if !entry.is_storable() {
            return Err(SwError::cache(format!(
                "refusing to store {} {} with status {}",
                entry.method, entry.url, entry.status
            )));
        }
        self.entries.insert(entry.url.clone(), entry);
        Ok(())
    }

    /// Delete entry.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Get all keys (URLs).
    pub fn keys(&self) -> Vec<&str> {
        self.entries.keys().map(|s| s.as_str()).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ==================== Cache Storage ====================

/// All cache versions known to the worker.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    caches: HashMap<String, Cache>,
}

impl CacheStorage {
    /// Create new cache storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a cache (creates if doesn't exist).
    pub fn open(&mut self, name: &str) -> &mut Cache {
        self.caches
            .entry(name.to_string())
            .or_insert_with(|| Cache::new(name))
    }

    /// Insert a whole cache, replacing one with the same name.
    pub fn insert(&mut self, cache: Cache) {
        self.caches.insert(cache.name.clone(), cache);
    }

    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.get(name)
    }

    /// Check if cache exists.
    pub fn has(&self, name: &str) -> bool {
        self.caches.contains_key(name)
    }

    /// Delete a cache.
    pub fn delete(&mut self, name: &str) -> bool {
        self.caches.remove(name).is_some()
    }

    /// Get all cache names, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.caches.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Match a request in one named cache.
    pub fn match_in(&self, name: &str, key: &str) -> Option<&CacheEntry> {
        self.caches.get(name)?.match_request(key)
    }
}
