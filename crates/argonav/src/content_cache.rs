//
// content_cache.rs
//
// Short-lived file content cache shared by concurrent scans
//

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::NavigationConfig;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8", path.display())]
    Decode { path: PathBuf },
}

/// Cached file entry
#[derive(Debug, Clone)]
struct CacheEntry {
    content: Arc<str>,
    timestamp: Instant,
}

/// Time-bounded cache of file text keyed by path.
///
/// Entries are served without I/O while younger than `timeout`. Once the
/// cache holds more than `sweep_threshold` entries, every insert sweeps out
/// all expired entries. There is no capacity bound: entries refreshed within
/// the window all stay.
#[derive(Debug)]
pub struct ContentCache {
    entries: DashMap<PathBuf, CacheEntry>,
    timeout: Duration,
    sweep_threshold: usize,
}

impl Default for ContentCache {
    fn default() -> Self {
        Self::from_config(&NavigationConfig::default())
    }
}

impl ContentCache {
    pub fn new(timeout: Duration, sweep_threshold: usize) -> Self {
        Self {
            entries: DashMap::new(),
            timeout,
            sweep_threshold,
        }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(
            config.content_cache_timeout,
            config.content_cache_sweep_threshold,
        )
    }

    /// Get file text, reading from disk on a miss or a stale entry.
    pub async fn get_content(&self, path: &Path) -> Result<Arc<str>, ContentError> {
        if let Some(content) = self.get_if_fresh(path) {
            return Ok(content);
        }

        let bytes = tokio::fs::read(path).await.map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|_| ContentError::Decode {
            path: path.to_path_buf(),
        })?;
        let content: Arc<str> = Arc::from(text);
        self.insert(path.to_path_buf(), content.clone());
        Ok(content)
    }

    /// Get cached content if it is younger than the timeout
    pub fn get_if_fresh(&self, path: &Path) -> Option<Arc<str>> {
        let entry = self.entries.get(path)?;
        if entry.timestamp.elapsed() < self.timeout {
            Some(entry.content.clone())
        } else {
            None
        }
    }

    /// Insert content with a fresh timestamp, sweeping expired entries once
    /// the cache has grown past the threshold.
    pub fn insert(&self, path: PathBuf, content: Arc<str>) {
        self.entries.insert(
            path,
            CacheEntry {
                content,
                timestamp: Instant::now(),
            },
        );

        if self.entries.len() > self.sweep_threshold {
            self.sweep_expired();
        }
    }

    /// Remove every entry older than the timeout
    pub fn sweep_expired(&self) {
        let before = self.entries.len();
        let timeout = self.timeout;
        self.entries
            .retain(|_, entry| entry.timestamp.elapsed() <= timeout);
        log::trace!(
            "Content cache sweep removed {} of {} entries",
            before.saturating_sub(self.entries.len()),
            before
        );
    }

    pub fn invalidate(&self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_timeout_skips_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.yaml");
        fs::write(&path, "name: one\n").unwrap();

        let cache = ContentCache::default();
        assert_eq!(&*cache.get_content(&path).await.unwrap(), "name: one\n");

        fs::write(&path, "name: two\n").unwrap();
        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(&*cache.get_content(&path).await.unwrap(), "name: one\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_reread() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.yaml");
        fs::write(&path, "name: one\n").unwrap();

        let cache = ContentCache::default();
        cache.get_content(&path).await.unwrap();

        fs::write(&path, "name: two\n").unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(&*cache.get_content(&path).await.unwrap(), "name: two\n");
    }

    #[tokio::test]
    async fn test_invalidate_forces_reread() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.yaml");
        fs::write(&path, "v1").unwrap();

        let cache = ContentCache::default();
        cache.get_content(&path).await.unwrap();
        fs::write(&path, "v2").unwrap();

        cache.invalidate(&path);
        assert!(!cache.contains(&path));
        assert_eq!(&*cache.get_content(&path).await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let cache = ContentCache::default();
        let err = cache
            .get_content(&dir.path().join("missing.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Io { .. }));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.yaml");
        fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let cache = ContentCache::default();
        let err = cache.get_content(&path).await.unwrap_err();
        assert!(matches!(err, ContentError::Decode { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_all_expired_entries_past_threshold() {
        let cache = ContentCache::new(Duration::from_secs(30), 2);
        cache.insert(PathBuf::from("/w/a.yaml"), Arc::from("a"));
        cache.insert(PathBuf::from("/w/b.yaml"), Arc::from("b"));

        tokio::time::advance(Duration::from_secs(31)).await;
        cache.insert(PathBuf::from("/w/c.yaml"), Arc::from("c"));

        assert_eq!(cache.len(), 1);
        assert!(cache.contains(Path::new("/w/c.yaml")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entries_survive_sweep() {
        let cache = ContentCache::new(Duration::from_secs(30), 2);
        for name in ["a", "b", "c", "d"] {
            cache.insert(PathBuf::from(format!("/w/{name}.yaml")), Arc::from(name));
        }
        // Over the threshold but nothing expired: no capacity eviction
        assert_eq!(cache.len(), 4);
    }
}
