//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Process execution (outcomes, durations)
//! - Conversions (per converter and result)
//! - Discovery (converters loaded)

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

// =============================================================================
// Process Execution Metrics
// =============================================================================

/// Process executions total by outcome.
pub static PROCESS_EXECUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "docshift_process_executions_total",
            "Total external process executions",
        ),
        &["outcome"], // "completed", "timed_out", "spawn_failed", "interrupted"
    )
    .unwrap()
});

/// Process wall-clock duration in seconds.
pub static PROCESS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docshift_process_duration_seconds",
            "Wall-clock duration of external processes",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Conversion Metrics
// =============================================================================

/// Conversions total by converter and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("docshift_conversions_total", "Total document conversions"),
        &["converter", "result"], // result: "success", "failed"
    )
    .unwrap()
});

/// Conversion duration in seconds.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "docshift_conversion_duration_seconds",
            "Duration of document conversions",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        &["converter"],
    )
    .unwrap()
});

// =============================================================================
// Discovery Metrics
// =============================================================================

/// Converters active after the last discovery.
pub static DISCOVERED_CONVERTERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "docshift_discovered_converters",
        "Number of external converters loaded by discovery",
    )
    .unwrap()
});

/// Shared registry, populated from [`all_metrics`] on first use.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!(error = %e, "Failed to register metric");
        }
    }
    registry
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Process execution
        Box::new(PROCESS_EXECUTIONS.clone()),
        Box::new(PROCESS_DURATION.clone()),
        // Conversions
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        // Discovery
        Box::new(DISCOVERED_CONVERTERS.clone()),
    ]
}

/// Registry holding every core metric.
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Encode all core metrics in the Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
