//! Observability infrastructure for the price predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, counts, unseen categories, model version)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge_vec, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

struct ServiceMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounter,
    unseen_category_total: IntCounterVec,
    model_version_info: GaugeVec,
    lookup_entries: IntGaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "vehicle_price_prediction_latency_seconds",
                "Time spent building features and running the price pipeline",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "vehicle_price_predictions_total",
                "Total number of price predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter!(
                "vehicle_price_prediction_errors_total",
                "Total number of failed pipeline invocations"
            )
            .expect("Failed to register prediction_errors_total"),

            unseen_category_total: register_int_counter_vec!(
                "vehicle_price_unseen_category_total",
                "Inputs resolved through a default because the value was not seen in training",
                &["kind"]
            )
            .expect("Failed to register unseen_category_total"),

            model_version_info: register_gauge_vec!(
                "vehicle_price_model_version_info",
                "Information about the currently loaded price pipeline",
                &["version"]
            )
            .expect("Failed to register model_version_info"),

            lookup_entries: register_int_gauge_vec!(
                "vehicle_price_lookup_entries",
                "Number of entries in each training-time lookup table",
                &["table"]
            )
            .expect("Failed to register lookup_entries"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ServiceMetrics {
    _private: (),
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ServiceMetricsInner {
        GLOBAL_METRICS.get_or_init(ServiceMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    /// Count a default substitution (`brand`, `model` or `engine_category`)
    pub fn inc_unseen_category(&self, kind: &str) {
        self.inner()
            .unseen_category_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Update model version info
    pub fn set_model_version(&self, version: &str) {
        self.inner().model_version_info.reset();
        self.inner()
            .model_version_info
            .with_label_values(&[version])
            .set(1.0);
    }

    pub fn set_lookup_entries(&self, table: &str, entries: usize) {
        self.inner()
            .lookup_entries
            .with_label_values(&[table])
            .set(entries as i64);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a served prediction
    pub fn log_prediction(
        &self,
        brand: &str,
        model: &str,
        yom: i32,
        predicted_price: f64,
        model_version: &str,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            brand = %brand,
            model = %model,
            yom = yom,
            predicted_price = predicted_price,
            model_version = %model_version,
            "Generated price prediction"
        );
    }

    /// Log an input that fell back to a default policy
    pub fn log_unseen_category(&self, kind: &str, value: &str) {
        warn!(
            event = "unseen_category",
            service = %self.service,
            kind = %kind,
            value = %value,
            "Input not seen in training, using default"
        );
    }

    pub fn log_prediction_failed(&self, brand: &str, model: &str, error: &anyhow::Error) {
        error!(
            event = "prediction_failed",
            service = %self.service,
            brand = %brand,
            model = %model,
            error = %format!("{:#}", error),
            "Price pipeline failed"
        );
    }

    /// Log a completed artifact load
    pub fn log_artifacts_loaded(&self, dir: &str, model_version: &str, lookup_entries: usize) {
        info!(
            event = "artifacts_loaded",
            service = %self.service,
            artifacts_dir = %dir,
            model_version = %model_version,
            lookup_entries = lookup_entries,
            "Model artifacts loaded"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, model_version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            model_version = %model_version,
            addr = %addr,
            "Price prediction service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Price prediction service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_metrics_creation() {
        // Metrics live in the global Prometheus registry; every handle shares them.
        let metrics = ServiceMetrics::new();
        let other = ServiceMetrics::new();

        metrics.observe_prediction_latency(0.002);
        metrics.inc_predictions();
        other.inc_prediction_errors();
        metrics.inc_unseen_category("brand");
        metrics.set_model_version("v1.0.0");
        metrics.set_lookup_entries("brand_freq", 42);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "vehicle_price_unseen_category_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-service");
        assert_eq!(logger.service, "test-service");
    }
}
