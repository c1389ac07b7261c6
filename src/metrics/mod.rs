//! Prometheus metrics for the refresh engine
//!
//! This module provides metrics tracking for:
//! - Refresh jobs: outcome per job, refresh duration
//! - Entries: created, updated, deduplicated and removed per refresh
//! - User cache: hits and misses per refresh cycle
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Histogram,
    IntCounter,
};
use std::sync::OnceLock;

use crate::cache::CacheStats;
use crate::reconcile::RefreshOutcome;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all refresh metrics
struct RefreshMetrics {
    jobs: CounterVec,
    duration: Histogram,
    entries: CounterVec,
    entries_removed: CounterVec,
    cache_hits: IntCounter,
    cache_misses: IntCounter,
}

/// Global storage for refresh metrics
static REFRESH_METRICS: OnceLock<RefreshMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, errors are logged and subsequent
/// metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = freshet::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = RefreshMetrics {
        jobs: register_counter_vec!(
            "freshet_refresh_jobs_total",
            "Total refresh jobs by status",
            &["status"]
        )?,
        duration: register_histogram!(
            "freshet_refresh_duration_seconds",
            "Time spent refreshing a single feed in seconds",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
        )?,
        entries: register_counter_vec!(
            "freshet_entries_total",
            "Entries persisted by kind (created, updated, dedup)",
            &["kind"]
        )?,
        entries_removed: register_counter_vec!(
            "freshet_entries_removed_total",
            "Entries dropped before reconciliation by reason",
            &["reason"]
        )?,
        cache_hits: register_int_counter!(
            "freshet_user_cache_hits_total",
            "User lookups served from the per-cycle cache"
        )?,
        cache_misses: register_int_counter!(
            "freshet_user_cache_misses_total",
            "User lookups that reached the store"
        )?,
    };

    REFRESH_METRICS
        .set(metrics)
        .map_err(|_| "Refresh metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    fn new(timer: prometheus::HistogramTimer) -> Self {
        Self { timer: Some(timer) }
    }

    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a refresh timer (returns a timer handle)
pub fn start_refresh_timer() -> MetricsTimer {
    match REFRESH_METRICS.get() {
        Some(m) => MetricsTimer::new(m.duration.start_timer()),
        None => MetricsTimer::noop(),
    }
}

/// Record the outcome of one refresh job
pub fn record_refresh_job(success: bool) {
    if let Some(m) = REFRESH_METRICS.get() {
        let status = if success { "success" } else { "failure" };
        m.jobs.with_label_values(&[status]).inc();
    }
}

/// Record the entry counts of a successful refresh
pub fn record_refresh_outcome(outcome: &RefreshOutcome) {
    let Some(m) = REFRESH_METRICS.get() else {
        return;
    };

    let persisted = [
        ("created", outcome.created()),
        ("updated", outcome.updated()),
        ("dedup", outcome.dedups),
    ];
    for (kind, count) in persisted {
        if count > 0 {
            m.entries.with_label_values(&[kind]).inc_by(count as f64);
        }
    }

    let removed = [
        ("age", outcome.removed_by_age),
        ("filter", outcome.removed_by_filter),
        ("duplicate", outcome.removed_broken),
    ];
    for (reason, count) in removed {
        if count > 0 {
            m.entries_removed
                .with_label_values(&[reason])
                .inc_by(count as f64);
        }
    }
}

/// Record the user cache counters of a finished refresh cycle
pub fn record_cache_stats(stats: CacheStats) {
    if let Some(m) = REFRESH_METRICS.get() {
        m.cache_hits.inc_by(stats.hits);
        m.cache_misses.inc_by(stats.misses);
    }
}

// ============================================================================
// Tests
// ============================================================================
