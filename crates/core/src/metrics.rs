//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Source monitor (polls, discovery failures, enqueue decisions)
//! - Acquisition (profile selection, outcomes, breaker trips, live aborts)
//! - Worker pool (task outcomes, durations, cleanup)
//! - External services (LLM, knowledge base, publisher)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Source Monitor
// =============================================================================

/// Completed poll cycles.
pub static POLL_CYCLES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mirror_poll_cycles_total", "Total completed poll cycles").unwrap()
});

/// Discovery tier failures.
pub static DISCOVERY_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirror_discovery_failures_total",
            "Discovery failures by tier",
        ),
        &["tier"], // "listing", "feed", "all"
    )
    .unwrap()
});

/// Items enqueued for workers.
pub static ITEMS_ENQUEUED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("mirror_items_enqueued_total", "Total items enqueued").unwrap()
});

/// Items dropped because the queue was full.
pub static ITEMS_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mirror_items_dropped_total",
        "Items dropped because the task queue was full",
    )
    .unwrap()
});

/// New items skipped during classification.
pub static ITEMS_SKIPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirror_items_skipped_total", "New items not enqueued"),
        &["reason"], // "upcoming", "too_long", "classification_failed"
    )
    .unwrap()
});

/// Current task queue depth.
pub static QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mirror_queue_depth", "Tasks waiting in the queue").unwrap()
});

// =============================================================================
// Acquisition
// =============================================================================

/// Acquisition results by outcome.
pub static ACQUISITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirror_acquisitions_total", "Acquisition results"),
        &["outcome"], // "success", "probe_failed", "download_failed", "frame_overflow", "missing_output"
    )
    .unwrap()
});

/// Client profile selected by the probe phase.
pub static PROFILE_SELECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirror_profile_selected_total",
            "Client profile chosen by the probe phase",
        ),
        &["profile", "reason"], // reason: "hd", "best_effort"
    )
    .unwrap()
});

/// Download ladder fallbacks beyond the selected profile.
pub static DOWNLOAD_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mirror_download_fallbacks_total",
        "Download attempts with a profile other than the selected one",
    )
    .unwrap()
});

/// Frame-overflow breaker trips.
pub static FRAME_OVERFLOWS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mirror_frame_overflows_total",
        "Artifacts discarded for exceeding the frame ceiling",
    )
    .unwrap()
});

/// Live captures aborted by the elapsed-time observer.
pub static LIVE_ABORTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mirror_live_aborts_total",
        "Live captures aborted at the capture cap",
    )
    .unwrap()
});

// =============================================================================
// Worker Pool
// =============================================================================

/// Task outcomes by kind.
pub static TASK_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirror_task_outcomes_total", "Task outcomes"),
        &["kind"],
    )
    .unwrap()
});

/// Task wall-clock duration.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("mirror_task_duration_seconds", "Duration of one task")
            .buckets(vec![
                10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0,
            ]),
        &["kind"],
    )
    .unwrap()
});

/// Workers currently running a task.
pub static WORKERS_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mirror_workers_busy", "Workers currently running a task").unwrap()
});

/// Cleanup or maintenance failures.
pub static CLEANUP_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirror_cleanup_failures_total",
            "Work directory or maintenance failures",
        ),
        &["stage"], // "workdir", "maintenance"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mirror_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 90.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mirror_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one external call.
pub fn record_external(service: &str, operation: &str, elapsed_secs: f64, ok: bool) {
    EXTERNAL_SERVICE_DURATION
        .with_label_values(&[service, operation])
        .observe(elapsed_secs);
    EXTERNAL_SERVICE_REQUESTS
        .with_label_values(&[service, operation, if ok { "success" } else { "error" }])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Monitor
        Box::new(POLL_CYCLES.clone()),
        Box::new(DISCOVERY_FAILURES.clone()),
        Box::new(ITEMS_ENQUEUED.clone()),
        Box::new(ITEMS_DROPPED.clone()),
        Box::new(ITEMS_SKIPPED.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        // Acquisition
        Box::new(ACQUISITIONS.clone()),
        Box::new(PROFILE_SELECTED.clone()),
        Box::new(DOWNLOAD_FALLBACKS.clone()),
        Box::new(FRAME_OVERFLOWS.clone()),
        Box::new(LIVE_ABORTS.clone()),
        // Workers
        Box::new(TASK_OUTCOMES.clone()),
        Box::new(TASK_DURATION.clone()),
        Box::new(WORKERS_BUSY.clone()),
        Box::new(CLEANUP_FAILURES.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
