//! File-based cache for catalog and pricing lookups

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::CatalogError;

/// JSON-on-disk cache keyed by name, expired by file modification time.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the cached value if it exists, parses, and is younger than
    /// `ttl`. Any miss condition returns `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let path = self.path(key);
        let metadata = fs::metadata(&path).ok()?;
        let modified = metadata.modified().ok()?;
        if modified.elapsed().ok()? > ttl {
            debug!(key, "cache entry expired");
            return None;
        }

        let data = fs::read(&path).ok()?;
        serde_json::from_slice(&data).ok()
    }

    /// Stores a value under the key, creating the cache directory on
    /// first use.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CatalogError> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec(value)?;
        fs::write(self.path(key), data)?;
        Ok(())
    }

    /// Removes all cached entries.
    pub fn clear(&self) -> Result<(), CatalogError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            fs::remove_file(entry?.path())?;
        }
        Ok(())
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

/// Default cache location under the user's home directory.
pub(crate) fn default_cache_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| Path::new(&home).join(".cache").join("nodefit"))
}
