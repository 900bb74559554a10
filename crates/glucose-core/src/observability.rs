//! Observability infrastructure for the forecast service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, prediction/error counts, model load state)
//! - Structured JSON logging with tracing

use crate::error::ForecastError;
use crate::model::ModelError;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::path::Path;
use std::sync::OnceLock;
use tracing::{error, info};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Error code for request bodies that cannot be decoded
pub const MALFORMED_REQUEST_CODE: &str = "invalid_request";

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ForecastMetricsInner> = OnceLock::new();

struct ForecastMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounterVec,
    model_load_attempts_total: IntCounter,
    model_loaded: IntGauge,
}

impl ForecastMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "glucose_forecast_prediction_latency_seconds",
                "End-to-end time spent handling a prediction request",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_total: register_int_counter!(
                "glucose_forecast_predictions_total",
                "Total number of predictions generated"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "glucose_forecast_prediction_errors_total",
                "Total number of failed prediction requests by error code",
                &["code"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_load_attempts_total: register_int_counter!(
                "glucose_forecast_model_load_attempts_total",
                "Total number of attempts to load model weights"
            )
            .expect("Failed to register model_load_attempts_total"),

            model_loaded: register_int_gauge!(
                "glucose_forecast_model_loaded",
                "1 when a model instance is cached and serving, 0 otherwise"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Service metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ForecastMetrics {
    _private: (),
}

impl Default for ForecastMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ForecastMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ForecastMetricsInner {
        GLOBAL_METRICS.get_or_init(ForecastMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    pub fn inc_prediction_errors(&self, code: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[code])
            .inc();
    }

    pub fn inc_model_load_attempts(&self) {
        self.inner().model_load_attempts_total.inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Structured logger for service events
///
/// Provides consistent JSON-formatted logging for predictions,
/// model lifecycle, and health checks.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a successful prediction
    pub fn log_prediction(&self, user_id: &str, latency_ms: f64) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            user_id = %user_id,
            latency_ms = latency_ms,
            "Generated prediction for user {} in {}ms",
            user_id,
            latency_ms
        );
    }

    /// Log a failed prediction with its full cause
    pub fn log_prediction_failure(&self, user_id: &str, err: &ForecastError) {
        error!(
            event = "prediction_failed",
            service = %self.service,
            user_id = %user_id,
            code = err.code(),
            client_fault = err.is_client_error(),
            cause = %error_chain(err),
            "Prediction error"
        );
    }

    /// Log a request whose body could not be decoded. The user is unknown.
    pub fn log_malformed_request(&self, reason: &str) {
        error!(
            event = "prediction_failed",
            service = %self.service,
            code = MALFORMED_REQUEST_CODE,
            client_fault = true,
            cause = %reason,
            "Prediction error"
        );
    }

    pub fn log_model_loaded(&self, path: &Path, sha256: &str, size_bytes: usize, load_ms: f64) {
        info!(
            event = "model_loaded",
            service = %self.service,
            path = %path.display(),
            sha256 = %sha256,
            size_bytes = size_bytes,
            load_ms = load_ms,
            "Model loaded successfully from {}",
            path.display()
        );
    }

    pub fn log_model_load_failed(&self, path: &Path, err: &ModelError) {
        error!(
            event = "model_load_failed",
            service = %self.service,
            path = %path.display(),
            cause = %error_chain(err),
            "Failed to load model"
        );
    }

    pub fn log_health_check_failed(&self, err: &ForecastError) {
        error!(
            event = "health_check_failed",
            service = %self.service,
            cause = %error_chain(err),
            "Health check failed"
        );
    }

    pub fn log_startup(&self, version: &str, addr: &str, model_path: &Path) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            addr = %addr,
            model_path = %model_path.display(),
            "Glucose forecast service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Glucose forecast service shutting down"
        );
    }
}

/// Render an error and all of its sources as `outer: inner: ...`
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_metrics_creation() {
        let metrics = ForecastMetrics::new();

        metrics.observe_prediction_latency(0.002);
        metrics.inc_predictions();
        metrics.inc_prediction_errors("invalid_shape");
        metrics.inc_model_load_attempts();
        metrics.set_model_loaded(true);

        // A second handle shares the registered collectors.
        let again = ForecastMetrics::new();
        again.inc_predictions();
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("glucose-forecast");
        assert_eq!(logger.service, "glucose-forecast");
    }

    #[test]
    fn test_error_chain_includes_source() {
        let io = ModelError::Io {
            path: "missing.safetensors".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        let err = ForecastError::ModelLoad(io);
        let rendered = error_chain(&err);

        assert!(rendered.starts_with("failed to load model"));
        assert!(rendered.contains("missing.safetensors"));
        assert!(rendered.contains("no such file"));
    }
}
