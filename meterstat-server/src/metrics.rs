// Meterstat Server - Prometheus metrics definitions
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics exposed on `/metrics`.

use lazy_static::lazy_static;
use meterstat::ErrorKind;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Encoder, Gauge,
    TextEncoder,
};

lazy_static! {
    /// Requests served, labeled by endpoint.
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "meterstat_requests_total",
        "Requests served by endpoint",
        &["endpoint"]
    ).unwrap();

    /// Analyzer failures, labeled by error kind.
    pub static ref ANALYSIS_FAILURES_TOTAL: CounterVec = register_counter_vec!(
        "meterstat_analysis_failures_total",
        "Analytics failures by error kind",
        &["kind"]
    ).unwrap();

    /// Latest-point checks that came back anomalous.
    pub static ref SPIKES_FLAGGED_TOTAL: Counter = register_counter!(
        "meterstat_spikes_flagged_total",
        "Spike checks whose latest point exceeded the limit"
    ).unwrap();

    /// Samples accepted into the store.
    pub static ref SAMPLES_INGESTED_TOTAL: Counter = register_counter!(
        "meterstat_samples_ingested_total",
        "Samples appended to the series store"
    ).unwrap();

    /// Raw samples read from the store for analysis.
    pub static ref SAMPLES_SCANNED_TOTAL: Counter = register_counter!(
        "meterstat_samples_scanned_total",
        "Samples read from the store for aggregation"
    ).unwrap();

    /// Series currently held.
    pub static ref SERIES_STORED: Gauge = register_gauge!(
        "meterstat_series_stored",
        "Number of series held in the store"
    ).unwrap();
}

/// Count one request against an endpoint label.
pub fn record_request(endpoint: &str) {
    REQUESTS_TOTAL.with_label_values(&[endpoint]).inc();
}

pub fn record_analysis_failure(kind: ErrorKind) {
    ANALYSIS_FAILURES_TOTAL
        .with_label_values(&[kind.as_str()])
        .inc();
}

pub fn record_spike() {
    SPIKES_FLAGGED_TOTAL.inc();
}

pub fn record_ingest(samples: usize) {
    SAMPLES_INGESTED_TOTAL.inc_by(samples as f64);
}

pub fn record_scan(samples: usize) {
    SAMPLES_SCANNED_TOTAL.inc_by(samples as f64);
}

pub fn update_series_count(count: usize) {
    SERIES_STORED.set(count as f64);
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
