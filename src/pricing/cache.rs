//! Persistent price cache
//!
//! Content-addressed filesystem cache for `PriceResult` values. The cache key
//! is a SHA-256 digest of the query's canonical string, so logically identical
//! queries built on different code paths collide on the same entry. The file's
//! modification time stands in for "fetched at"; entries older than the TTL are
//! treated as absent and unlinked on the read that observes the expiry.
//!
//! Caching is an optimization, not a correctness requirement: every read
//! failure degrades to a miss and every write failure to a no-op, logged via
//! `tracing` but never surfaced to callers.

use crate::error::Result;
use crate::pricing::{PriceQuery, PriceResult};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Default entry lifetime. AWS list prices move slowly; a week keeps repeated
/// analyses off the network without serving stale rates for long.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Filesystem-backed price cache with TTL expiry.
#[derive(Debug, Clone)]
pub struct PriceCache {
    dir: PathBuf,
    ttl: Duration,
}

impl PriceCache {
    /// Open a cache rooted at `dir`, creating the directory if absent.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        let dir = dir.into();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Failed to create price cache dir {}: {}", dir.display(), e);
        }
        Self { dir, ttl }
    }

    pub fn with_default_ttl(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir, DEFAULT_TTL)
    }

    fn entry_path(&self, query: &PriceQuery) -> PathBuf {
        let digest = Sha256::digest(query.canonical_string().as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Look up a cached price. An expired entry behaves exactly like a miss
    /// and is deleted so stale files don't accumulate.
    pub fn get(&self, query: &PriceQuery) -> Option<PriceResult> {
        let path = self.entry_path(query);

        if self.is_expired(&path) {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!("Failed to remove expired cache entry {}: {}", path.display(), e);
            }
            return None;
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!("Cache read failed for {}: {}", path.display(), e);
                }
                return None;
            }
        };

        match serde_json::from_slice::<PriceResult>(&bytes) {
            Ok(mut result) => {
                result.from_cache = true;
                Some(result)
            }
            Err(e) => {
                // Corrupt entry: drop it so the next fetch rewrites it.
                debug!("Corrupt cache entry {}: {}", path.display(), e);
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    /// Persist a freshly fetched price. Best-effort: failures are logged and
    /// swallowed so callers can always proceed as if nothing were cached.
    pub fn set(&self, query: &PriceQuery, result: &PriceResult) {
        let path = self.entry_path(query);
        let json = match serde_json::to_vec(result) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize price result for cache: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            warn!("Failed to write cache entry {}: {}", path.display(), e);
        }
    }

    /// Remove every entry in the cache directory.
    pub fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.path().extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn is_expired(&self, path: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(path) else {
            return false; // absent entries are plain misses, not expiries
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > self.ttl)
            .unwrap_or(false)
    }
}
