//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use glucose_core::{
    epoch_seconds, ErrorResponse, ForecastError, ForecastMetrics, HealthReporter, HealthResponse,
    HealthStatus, InferenceHandler, PredictionRequest, PredictionResponse, MALFORMED_REQUEST_CODE,
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<InferenceHandler>,
    pub health: HealthReporter,
    pub metrics: ForecastMetrics,
}

impl AppState {
    pub fn new(handler: Arc<InferenceHandler>, health: HealthReporter, metrics: ForecastMetrics) -> Self {
        Self {
            handler,
            health,
            metrics,
        }
    }
}

/// Error response with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            body: ErrorResponse {
                error: err.public_message(),
                code: err.code().to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: rejection.body_text(),
                code: MALFORMED_REQUEST_CODE.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Generate a forecast - 200 on success, 400 for bad input, 500 otherwise
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        state.handler.reject_malformed(&rejection.body_text());
        ApiError::from(rejection)
    })?;

    // The pipeline is synchronous and may read weights from disk on a cold
    // start, so keep it off the async workers.
    let handler = Arc::clone(&state.handler);
    let response = tokio::task::spawn_blocking(move || handler.predict(&request))
        .await
        .map_err(|e| {
            error!(event = "prediction_failed", cause = %e, "Prediction task did not complete");
            state.metrics.inc_prediction_errors("inference_failed");
            ForecastError::Inference(format!("prediction task failed: {}", e))
        })??;

    Ok(Json(response))
}

/// Health check - always 200, status is "ok" or "error"
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let reporter = state.health.clone();
    let report = tokio::task::spawn_blocking(move || reporter.check())
        .await
        .unwrap_or_else(|e| {
            error!(event = "health_check_failed", cause = %e, "Health check task did not complete");
            HealthResponse {
                status: HealthStatus::Error,
                version: crate::SERVICE_VERSION.to_string(),
                timestamp: epoch_seconds(),
            }
        });

    Json(report)
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(cause = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
