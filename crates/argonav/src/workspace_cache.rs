//
// workspace_cache.rs
//
// Session cache of resolved WorkflowTemplate definitions
//

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::Instant;

use crate::config::NavigationConfig;
use crate::types::SourceLocation;

#[derive(Debug)]
struct Snapshot {
    templates: IndexMap<String, Vec<SourceLocation>>,
    last_scanned: Instant,
}

/// Resolved definition locations by WorkflowTemplate name.
///
/// A single snapshot lives until it is older than `timeout` or until any
/// YAML file in the workspace changes, at which point it is dropped whole.
/// Writers pass the generation they observed before scanning; a write from
/// a scan that raced with an invalidation is discarded.
#[derive(Debug)]
pub struct WorkspaceCache {
    inner: RwLock<Option<Snapshot>>,
    generation: AtomicU64,
    timeout: Duration,
}

impl Default for WorkspaceCache {
    fn default() -> Self {
        Self::from_config(&NavigationConfig::default())
    }
}

impl WorkspaceCache {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: RwLock::new(None),
            generation: AtomicU64::new(0),
            timeout,
        }
    }

    pub fn from_config(config: &NavigationConfig) -> Self {
        Self::new(config.workspace_cache_timeout)
    }

    /// Current invalidation generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_live(&self, snapshot: &Snapshot) -> bool {
        snapshot.last_scanned.elapsed() <= self.timeout
    }

    /// Cached locations for `name` if the snapshot is still live
    pub fn lookup(&self, name: &str) -> Option<Vec<SourceLocation>> {
        let guard = self.inner.read().ok()?;
        let snapshot = guard.as_ref()?;
        if !self.is_live(snapshot) {
            return None;
        }
        snapshot.templates.get(name).cloned()
    }

    /// Record resolved locations for `name`.
    ///
    /// No-op if the cache was invalidated after `generation` was read.
    pub fn record(&self, generation: u64, name: &str, locations: Vec<SourceLocation>) {
        let Ok(mut guard) = self.inner.write() else {
            return;
        };
        if self.generation() != generation {
            log::trace!("Discarding stale workspace cache entry for '{}'", name);
            return;
        }

        let live = guard.as_ref().map(|s| self.is_live(s)).unwrap_or(false);
        if !live {
            *guard = Some(Snapshot {
                templates: IndexMap::new(),
                last_scanned: Instant::now(),
            });
        }
        if let Some(snapshot) = guard.as_mut() {
            snapshot.templates.insert(name.to_string(), locations);
        }
    }

    /// Drop the snapshot
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.inner.write() {
            if guard.take().is_some() {
                log::trace!("Workspace cache invalidated");
            }
        }
    }

    /// Number of names in a live snapshot
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .ok()
            .and_then(|g| {
                g.as_ref()
                    .filter(|s| self.is_live(s))
                    .map(|s| s.templates.len())
            })
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
