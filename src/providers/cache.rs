use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Get the platform-appropriate cache directory for bite-forecast
pub fn get_cache_path() -> PathBuf {
    dirs::cache_dir()
        .map(|p| p.join("bite-forecast/http-cache"))
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/.cache/bite-forecast/http-cache",
                std::env::var("HOME").unwrap_or_default()
            ))
        })
}

/// Cached response body with the time it was fetched
#[derive(Debug, Serialize, Deserialize)]
struct CachedBody {
    body: String,
    fetched_at: u64, // Unix timestamp
}

/// Disk cache for raw provider responses, backed by cacache.
///
/// Reads and writes are best-effort: a broken cache behaves like an empty one.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    path: PathBuf,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self { path, ttl }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached body for `key` if it is younger than the TTL
    pub fn get(&self, key: &str) -> Option<String> {
        let bytes = cacache::read_sync(&self.path, key).ok()?;
        let cached: CachedBody = serde_json::from_slice(&bytes).ok()?;
        if is_fresh(cached.fetched_at, now_secs(), self.ttl) {
            Some(cached.body)
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, body: &str) -> Result<()> {
        let entry = CachedBody {
            body: body.to_string(),
            fetched_at: now_secs(),
        };
        let json = serde_json::to_vec(&entry)?;
        cacache::write_sync(&self.path, key, json)?;
        Ok(())
    }
}

/// Clear the response cache directory
pub fn clear_cache(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).context("Failed to remove cache directory"),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn is_fresh(fetched_at: u64, now: u64, ttl: Duration) -> bool {
    now.saturating_sub(fetched_at) < ttl.as_secs()
}
