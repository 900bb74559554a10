//! Wire records for the prediction service

use serde::{Deserialize, Serialize};

/// Body of `POST /predict`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Historical glucose readings, oldest first
    pub x_seq: Vec<f64>,
    /// Static patient features
    pub x_static: Vec<f64>,
    pub user_id: String,
}

/// Diagnostic statistics over the submitted history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSummary {
    pub sequence_mean: f64,
    /// Population standard deviation (divides by N)
    pub sequence_std: f64,
    pub sequence_min: f64,
    pub sequence_max: f64,
    pub processing_time_ms: f64,
}

/// Successful `POST /predict` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub user_id: String,
    /// Forecast readings, same order and units as `x_seq`
    pub prediction: Vec<f32>,
    /// Epoch seconds
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_summary: Option<InputSummary>,
}

/// Error body for 4xx/5xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Current time as fractional epoch seconds
pub fn epoch_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
