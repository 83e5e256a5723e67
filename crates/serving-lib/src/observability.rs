//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency/volume/errors per model kind)
//! - Structured JSON logging for service lifecycle events

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, register_int_gauge,
    GaugeVec, HistogramVec, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::info;

use crate::models::ModelKind;

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ServiceMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ServiceMetricsInner {
    prediction_latency_seconds: HistogramVec,
    predictions_total: IntCounterVec,
    prediction_errors_total: IntCounterVec,
    models_loaded: IntGauge,
    service_version_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram_vec!(
                "prediction_api_latency_seconds",
                "End-to-end time spent serving one prediction request",
                &["model"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter_vec!(
                "prediction_api_predictions_total",
                "Total number of prediction requests served",
                &["model"]
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "prediction_api_prediction_errors_total",
                "Total number of failed prediction requests",
                &["model", "category"]
            )
            .expect("Failed to register prediction_errors_total"),

            models_loaded: register_int_gauge!(
                "prediction_api_models_loaded",
                "Number of model kinds currently resident in the cache"
            )
            .expect("Failed to register models_loaded"),

            service_version_info: register_gauge_vec!(
                "prediction_api_service_version_info",
                "Information about the running service build",
                &["version"]
            )
            .expect("Failed to register service_version_info"),
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
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a served prediction with its latency
    pub fn observe_prediction(&self, kind: ModelKind, duration_secs: f64) {
        self.inner()
            .prediction_latency_seconds
            .with_label_values(&[kind.as_str()])
            .observe(duration_secs);
        self.inner()
            .predictions_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    /// Record a failed prediction by error category
    pub fn inc_prediction_error(&self, kind: ModelKind, category: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind.as_str(), category])
            .inc();
    }

    /// Update the loaded-model gauge
    pub fn set_models_loaded(&self, count: i64) {
        self.inner().models_loaded.set(count);
    }

    /// Update service version info
    pub fn set_service_version(&self, version: &str) {
        self.inner().service_version_info.reset();
        self.inner()
            .service_version_info
            .with_label_values(&[version])
            .set(1.0);
    }
}

/// Structured logger for service lifecycle events
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

    /// Log service startup
    pub fn log_startup(&self, version: &str, artifact_dir: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            artifact_dir = %artifact_dir,
            "Prediction service started"
        );
    }

    /// Log a model warm-up outcome
    pub fn log_warmup(&self, kind: ModelKind, success: bool) {
        info!(
            event = "model_warmup",
            service = %self.service,
            model = %kind,
            success = success,
            "Model warm-up finished"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_stopped",
            service = %self.service,
            reason = %reason,
            "Prediction service stopped"
        );
    }
}
