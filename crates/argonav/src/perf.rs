// perf.rs - Timing instrumentation for workspace queries
//
// Controlled via the ARGONAV_PERF environment variable.
//
// Usage:
//   ARGONAV_PERF=1 argonav --stdio        # Log query durations
//   ARGONAV_PERF=verbose argonav --stdio  # Also warn on slow queries

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static PERF_ENABLED: OnceLock<bool> = OnceLock::new();
static PERF_VERBOSE: OnceLock<bool> = OnceLock::new();

/// Check if performance timing is enabled
pub fn is_enabled() -> bool {
    *PERF_ENABLED.get_or_init(|| {
        std::env::var("ARGONAV_PERF")
            .map(|v| !v.is_empty() && v != "0" && v.to_lowercase() != "false")
            .unwrap_or(false)
    })
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    *PERF_VERBOSE.get_or_init(|| {
        std::env::var("ARGONAV_PERF")
            .map(|v| v.to_lowercase() == "verbose")
            .unwrap_or(false)
    })
}

/// RAII timing guard that logs duration on drop
///
/// ```
/// use argonav::perf::TimingGuard;
///
/// let _guard = TimingGuard::new("find_definition");
/// // ... do work ...
/// ```
pub struct TimingGuard {
    start: Instant,
    name: &'static str,
    threshold_warn_ms: Option<u64>,
    enabled: bool,
}

impl TimingGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
            threshold_warn_ms: None,
            enabled: is_enabled(),
        }
    }

    /// Create a timing guard that warns (in verbose mode) past `threshold_ms`
    pub fn with_threshold(name: &'static str, threshold_ms: u64) -> Self {
        Self {
            threshold_warn_ms: Some(threshold_ms),
            ..Self::new(name)
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        if !self.enabled {
            return;
        }

        let elapsed = self.start.elapsed();
        log::info!("[PERF] {} completed in {:?}", self.name, elapsed);

        if let Some(threshold) = self.threshold_warn_ms {
            if elapsed.as_millis() > threshold as u128 && is_verbose() {
                log::warn!(
                    "[PERF] {} exceeded threshold ({}ms > {}ms)",
                    self.name,
                    elapsed.as_millis(),
                    threshold
                );
            }
        }
    }
}

static FILES_SCANNED: AtomicU64 = AtomicU64::new(0);
static DEFINITION_CACHE_HITS: AtomicU64 = AtomicU64::new(0);

/// Count files handed to a scan
pub fn record_files_scanned(count: usize) {
    FILES_SCANNED.fetch_add(count as u64, Ordering::Relaxed);
}

/// Count a definition lookup answered from the workspace cache
pub fn record_definition_cache_hit() {
    DEFINITION_CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}

pub fn files_scanned() -> u64 {
    FILES_SCANNED.load(Ordering::Relaxed)
}

pub fn definition_cache_hits() -> u64 {
    DEFINITION_CACHE_HITS.load(Ordering::Relaxed)
}

/// Log cumulative counters (at shutdown)
pub fn log_summary() {
    if !is_enabled() {
        return;
    }
    log::info!("[PERF] === Session Summary ===");
    log::info!("[PERF] Files scanned: {}", files_scanned());
    log::info!("[PERF] Definition cache hits: {}", definition_cache_hits());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_guard_elapsed() {
        let guard = TimingGuard::with_threshold("test", 1);
        std::thread::sleep(Duration::from_millis(10));
        assert!(guard.elapsed().as_millis() >= 10);
    }

    #[test]
    fn test_counters_are_monotonic() {
        let before = files_scanned();
        record_files_scanned(3);
        assert!(files_scanned() >= before + 3);

        let hits = definition_cache_hits();
        record_definition_cache_hit();
        assert!(definition_cache_hits() > hits);
    }
}
