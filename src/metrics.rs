//! Prometheus metrics for the aggregation engine
//!
//! Storage round-trips, cache behaviour, resolved dimensions and curated
//! color misses. Registered once in the default registry; exposition is
//! available through [`gather_metrics`].
//!
//! Engine components record through a [`Recorder`] built from
//! `monitoring.metrics_enabled`; a disabled recorder leaves every metric
//! untouched.

use crate::config::MonitoringConfig;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder,
    HistogramVec, IntCounter, TextEncoder,
};

lazy_static! {
    // === Storage ===

    /// Storage queries by table and outcome
    pub static ref STORAGE_QUERIES_TOTAL: CounterVec = register_counter_vec!(
        "dataportal_storage_queries_total",
        "Total storage queries by table and outcome",
        &["table", "status"]
    ).unwrap();

    /// Storage query latency, pool wait included
    pub static ref STORAGE_QUERY_DURATION: HistogramVec = register_histogram_vec!(
        "dataportal_storage_query_duration_seconds",
        "Storage query latency in seconds",
        &["table"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();

    // === Cache ===

    /// Cache lookups by cache name and result (hit, miss, coalesced)
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = register_counter_vec!(
        "dataportal_cache_lookups_total",
        "Cache lookups by cache and result",
        &["cache", "result"]
    ).unwrap();

    // === Dimensions ===

    /// Resolved dimensions by kind and outcome
    pub static ref DIMENSIONS_TOTAL: CounterVec = register_counter_vec!(
        "dataportal_dimensions_total",
        "Resolved dimensions by kind and outcome",
        &["dimension", "outcome"]
    ).unwrap();

    /// End-to-end dimension resolution latency
    pub static ref DIMENSION_DURATION: HistogramVec = register_histogram_vec!(
        "dataportal_dimension_duration_seconds",
        "Dimension resolution latency in seconds",
        &["dimension"],
        vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
    ).unwrap();

    // === Colors ===

    /// Curated color lookups that fell back to the default color
    pub static ref COLOR_MISSES_TOTAL: IntCounter = register_int_counter!(
        "dataportal_color_misses_total",
        "Curated color lookups that fell back to the default color"
    ).unwrap();
}

/// Get metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Metrics contain invalid UTF-8: {}", e))
}

/// Record a storage query
#[inline]
pub fn record_storage_query(table: &str, duration_secs: f64, status: &str) {
    STORAGE_QUERIES_TOTAL.with_label_values(&[table, status]).inc();
    STORAGE_QUERY_DURATION
        .with_label_values(&[table])
        .observe(duration_secs);
}

/// Record a cache lookup
#[inline]
pub fn record_cache_lookup(cache: &str, result: &str) {
    CACHE_LOOKUPS_TOTAL.with_label_values(&[cache, result]).inc();
}

/// Record a resolved (or failed) dimension
#[inline]
pub fn record_dimension(dimension: &str, duration_secs: f64, outcome: &str) {
    DIMENSIONS_TOTAL
        .with_label_values(&[dimension, outcome])
        .inc();
    DIMENSION_DURATION
        .with_label_values(&[dimension])
        .observe(duration_secs);
}

/// Record curated color misses
#[inline]
pub fn record_color_misses(count: u64) {
    COLOR_MISSES_TOTAL.inc_by(count);
}

// ============================================================================
// Recorder
// ============================================================================

/// Per-engine switch in front of the process-wide metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorder {
    enabled: bool,
}

impl Default for Recorder {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl From<&MonitoringConfig> for Recorder {
    fn from(config: &MonitoringConfig) -> Self {
        Self::new(config.metrics_enabled)
    }
}

impl Recorder {
    /// Recorder that records when `enabled`
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Recorder that records nothing
    pub const fn disabled() -> Self {
        Self::new(false)
    }

    /// Whether metrics are recorded
    pub fn is_enabled(self) -> bool {
        self.enabled
    }

    /// See [`record_storage_query`]
    pub fn storage_query(self, table: &str, duration_secs: f64, status: &str) {
        if self.enabled {
            record_storage_query(table, duration_secs, status);
        }
    }

    /// See [`record_cache_lookup`]
    pub fn cache_lookup(self, cache: &str, result: &str) {
        if self.enabled {
            record_cache_lookup(cache, result);
        }
    }

    /// See [`record_dimension`]
    pub fn dimension(self, dimension: &str, duration_secs: f64, outcome: &str) {
        if self.enabled {
            record_dimension(dimension, duration_secs, outcome);
        }
    }

    /// See [`record_color_misses`]
    pub fn color_misses(self, count: u64) {
        if self.enabled && count > 0 {
            record_color_misses(count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_storage_query() {
        record_storage_query("primary_energy", 0.002, "success");
        let metrics = gather_metrics().expect("Failed to gather metrics");
        assert!(metrics.contains("dataportal_storage_queries_total"));
        assert!(metrics.contains("dataportal_storage_query_duration_seconds"));
    }

    #[test]
    fn test_color_miss_counter() {
        let before = COLOR_MISSES_TOTAL.get();
        record_color_misses(2);
        assert!(COLOR_MISSES_TOTAL.get() >= before + 2);
    }

    #[test]
    fn test_disabled_recorder_records_nothing() {
        let off = Recorder::from(&MonitoringConfig {
            metrics_enabled: false,
            ..MonitoringConfig::default()
        });
        assert!(!off.is_enabled());
        off.storage_query("recorder_off_table", 0.5, "success");
        off.cache_lookup("recorder-off", "hit");
        off.dimension("recorderOff", 0.5, "success");
        assert_eq!(
            STORAGE_QUERIES_TOTAL
                .with_label_values(&["recorder_off_table", "success"])
                .get(),
            0.0
        );
        assert_eq!(CACHE_LOOKUPS_TOTAL.with_label_values(&["recorder-off", "hit"]).get(), 0.0);
        assert_eq!(
            DIMENSIONS_TOTAL.with_label_values(&["recorderOff", "success"]).get(),
            0.0
        );

        let on = Recorder::default();
        on.cache_lookup("recorder-on", "hit");
        assert_eq!(CACHE_LOOKUPS_TOTAL.with_label_values(&["recorder-on", "hit"]).get(), 1.0);
    }
}
