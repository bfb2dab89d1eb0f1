// Filter metrics
//
// Lightweight counters for diagnosing how much work the filter does

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Diagnostic counters
///
/// Uses atomic operations so passes, the bridge, and the menu protocol can all
/// record without locks. Nothing reads these for decisions; they are logged on
/// demand or at shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Classification passes that ran to completion
    pub passes_run: AtomicU64,

    /// Pass requests that arrived while a pass was running
    pub passes_deferred: AtomicU64,

    /// Items examined (badge lane or classifier)
    pub items_processed: AtomicUsize,

    /// Items blocked (including dry-run highlights)
    pub items_blocked: AtomicUsize,

    /// Items whose fields could not be extracted
    pub items_unclassified: AtomicUsize,

    /// Menu protocols that found their target
    pub menu_targets_found: AtomicUsize,

    /// Menu protocols that did not
    pub menu_targets_missed: AtomicUsize,

    /// Dry-run outcomes replayed from the memo table
    pub dry_run_cache_hits: AtomicUsize,

    /// Total time spent inside passes in milliseconds
    pub total_pass_time_ms: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            passes_run: AtomicU64::new(0),
            passes_deferred: AtomicU64::new(0),
            items_processed: AtomicUsize::new(0),
            items_blocked: AtomicUsize::new(0),
            items_unclassified: AtomicUsize::new(0),
            menu_targets_found: AtomicUsize::new(0),
            menu_targets_missed: AtomicUsize::new(0),
            dry_run_cache_hits: AtomicUsize::new(0),
            total_pass_time_ms: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished pass and how long it took
    pub fn record_pass(&self, duration: Duration) {
        self.passes_run.fetch_add(1, Ordering::Relaxed);
        self.total_pass_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_pass_deferred(&self) {
        self.passes_deferred.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_processed(&self) {
        self.items_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_blocked(&self) {
        self.items_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_item_unclassified(&self) {
        self.items_unclassified.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a menu protocol outcome
    pub fn record_menu_result(&self, target_found: bool, from_cache: bool) {
        if from_cache {
            self.dry_run_cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if target_found {
            self.menu_targets_found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.menu_targets_missed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average pass duration in milliseconds
    pub fn avg_pass_time_ms(&self) -> f64 {
        let total = self.total_pass_time_ms.load(Ordering::Relaxed);
        let count = self.passes_run.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Filter Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Passes: {} run, {} deferred (avg: {:.2}ms)",
            self.passes_run.load(Ordering::Relaxed),
            self.passes_deferred.load(Ordering::Relaxed),
            self.avg_pass_time_ms()
        );
        tracing::info!(
            "Items: {} processed, {} blocked, {} unclassified",
            self.items_processed.load(Ordering::Relaxed),
            self.items_blocked.load(Ordering::Relaxed),
            self.items_unclassified.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Menu targets: {} found, {} missed, {} dry-run cache hits",
            self.menu_targets_found.load(Ordering::Relaxed),
            self.menu_targets_missed.load(Ordering::Relaxed),
            self.dry_run_cache_hits.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.passes_run.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.items_blocked.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_item_counters() {
        let metrics = Metrics::new();

        metrics.record_item_processed();
        metrics.record_item_processed();
        metrics.record_item_blocked();
        metrics.record_item_unclassified();

        assert_eq!(metrics.items_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.items_blocked.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.items_unclassified.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_menu_results() {
        let metrics = Metrics::new();

        metrics.record_menu_result(true, false);
        metrics.record_menu_result(false, true);

        assert_eq!(metrics.menu_targets_found.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.menu_targets_missed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.dry_run_cache_hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_pass_timing() {
        let metrics = Metrics::new();

        metrics.record_pass(Duration::from_millis(10));
        metrics.record_pass(Duration::from_millis(30));

        assert_eq!(metrics.passes_run.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.avg_pass_time_ms(), 20.0);
    }

    #[test]
    fn test_avg_pass_time_no_passes() {
        assert_eq!(Metrics::new().avg_pass_time_ms(), 0.0);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
