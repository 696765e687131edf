//! Prometheus registry for the agent.
//!
//! Registers the HTTP metrics of the status server next to every metric
//! exported by the core library, and refreshes the state gauges right
//! before each scrape.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mirror_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mirror_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static MONITOR_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mirror_monitor_running", "Whether the source monitor loop is running").unwrap()
});

pub static POOL_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("mirror_pool_running", "Whether the worker pool is running").unwrap()
});

pub static SOURCES_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mirror_sources_tracked",
        "Sources with a recorded last-seen item",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(MONITOR_RUNNING.clone())).unwrap();
    registry.register(Box::new(POOL_RUNNING.clone())).unwrap();
    registry.register(Box::new(SOURCES_TRACKED.clone())).unwrap();

    for metric in mirror_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh state gauges from the running components.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let monitor = state.monitor().status().await;
    MONITOR_RUNNING.set(if monitor.running { 1 } else { 0 });
    SOURCES_TRACKED.set(monitor.tracked_sources as i64);

    let pool = state.pool().status().await;
    POOL_RUNNING.set(if pool.running { 1 } else { 0 });
    mirror_core::metrics::QUEUE_DEPTH.set(pool.queue_depth as i64);
}

/// Collapse path parameters so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    match path {
        "/api/v1/health" | "/api/v1/config" | "/api/v1/status" | "/metrics" => path.to_string(),
        _ => "other".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/api/v1/status"), "/api/v1/status");
        assert_eq!(normalize_path("/favicon.ico"), "other");
    }

    #[test]
    fn test_registry_includes_core_metrics() {
        mirror_core::metrics::POLL_CYCLES.inc();
        let text = encode_metrics();
        assert!(text.contains("mirror_poll_cycles_total"));
    }
}
