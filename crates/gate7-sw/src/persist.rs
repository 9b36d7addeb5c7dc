//! Durable cache storage: one JSON file per cache version.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheEntry, CacheStorage};
use crate::{Result, SwError};

const EXTENSION: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    name: String,
    entries: Vec<CacheEntry>,
}

fn file_for(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.{}", urlencoding::encode(name), EXTENSION))
}

/// Load every cache version stored under `dir`. A missing directory is an
/// empty storage.
pub async fn load(dir: &Path) -> Result<CacheStorage> {
    let mut storage = CacheStorage::new();

    let mut listing = match fs::read_dir(dir).await {
        Ok(listing) => listing,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "No cache store yet");
            return Ok(storage);
        }
        Err(e) => return Err(SwError::storage(dir, e)),
    };

    while let Some(item) = listing
        .next_entry()
        .await
        .map_err(|e| SwError::storage(dir, e))?
    {
        let path = item.path();
        if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
            continue;
        }

        let raw = fs::read(&path)
            .await
            .map_err(|e| SwError::storage(&path, e))?;
        let snapshot: CacheSnapshot = serde_json::from_slice(&raw)?;

        let mut cache = Cache::new(&snapshot.name);
        for entry in snapshot.entries {
            if let Err(e) = cache.put(entry) {
                warn!(path = %path.display(), error = %e, "Skipping stored entry");
            }
        }
        debug!(cache = %cache.name, entries = cache.len(), "Loaded cache");
        storage.insert(cache);
    }

    Ok(storage)
}

/// Write `storage` under `dir`, removing files of versions that no longer
/// exist.
pub async fn save(dir: &Path, storage: &CacheStorage) -> Result<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| SwError::storage(dir, e))?;

    let mut written = HashSet::new();
    for name in storage.keys() {
        let Some(cache) = storage.get(name) else {
            continue;
        };

        let mut entries: Vec<CacheEntry> = cache.entries().cloned().collect();
        entries.sort_by(|a, b| a.url.cmp(&b.url));
        let snapshot = CacheSnapshot {
            name: name.to_string(),
            entries,
        };

        let path = file_for(dir, name);
        let tmp = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(&snapshot)?;
        fs::write(&tmp, json)
            .await
            .map_err(|e| SwError::storage(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| SwError::storage(&path, e))?;
        written.insert(path);
    }

    let mut listing = fs::read_dir(dir)
        .await
        .map_err(|e| SwError::storage(dir, e))?;
    while let Some(item) = listing
        .next_entry()
        .await
        .map_err(|e| SwError::storage(dir, e))?
    {
        let path = item.path();
        if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) && !written.contains(&path)
        {
            fs::remove_file(&path)
                .await
                .map_err(|e| SwError::storage(&path, e))?;
            debug!(path = %path.display(), "Removed stale cache file");
        }
    }

    info!(dir = %dir.display(), caches = written.len(), "Cache store saved");
    Ok(())
}
