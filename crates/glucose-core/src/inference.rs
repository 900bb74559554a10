//! Prediction request pipeline
//!
//! Validator -> registry -> model -> response assembly, for one request at a
//! time. The handler keeps no state between requests beyond counters.

use crate::error::ForecastError;
use crate::model::GlucoseLstm;
use crate::models::{epoch_seconds, InputSummary, PredictionRequest, PredictionResponse};
use crate::observability::{ForecastMetrics, StructuredLogger, MALFORMED_REQUEST_CODE};
use crate::registry::ModelRegistry;
use crate::validation::{RequestValidator, ValidatedInput};
use ndarray::{Array2, Array3};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Handles `/predict` requests against the registry's model
pub struct InferenceHandler {
    registry: Arc<ModelRegistry>,
    validator: RequestValidator,
    metrics: ForecastMetrics,
    logger: StructuredLogger,
    forward_passes: AtomicU64,
    failures: AtomicU64,
}

impl InferenceHandler {
    pub fn new(
        registry: Arc<ModelRegistry>,
        metrics: ForecastMetrics,
        logger: StructuredLogger,
    ) -> Self {
        let validator = RequestValidator::for_model(registry.config());
        Self {
            registry,
            validator,
            metrics,
            logger,
            forward_passes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Run one prediction end to end.
    ///
    /// Validation failures return before the registry is consulted. Every
    /// failure is logged once with its full cause; callers should only show
    /// [`ForecastError::public_message`] to clients.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, ForecastError> {
        let start = Instant::now();

        match self.run(request, start) {
            Ok(response) => {
                let latency_ms = response
                    .input_summary
                    .as_ref()
                    .map(|s| s.processing_time_ms)
                    .unwrap_or_default();
                self.metrics.inc_predictions();
                self.metrics
                    .observe_prediction_latency(start.elapsed().as_secs_f64());
                self.logger.log_prediction(&request.user_id, latency_ms);
                Ok(response)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                self.metrics.inc_prediction_errors(e.code());
                self.logger.log_prediction_failure(&request.user_id, &e);
                Err(e)
            }
        }
    }

    /// Account for a request rejected before it reached [`Self::predict`],
    /// e.g. a body that is not valid JSON or lacks a field.
    pub fn reject_malformed(&self, reason: &str) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_prediction_errors(MALFORMED_REQUEST_CODE);
        self.logger.log_malformed_request(reason);
    }

    /// Handler statistics
    pub fn stats(&self) -> HandlerStats {
        HandlerStats {
            forward_passes: self.forward_passes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn run(&self, request: &PredictionRequest, start: Instant) -> Result<PredictionResponse, ForecastError> {
        let input = self.validator.validate(request)?;
        let model = self.registry.get()?;
        let prediction = self.forward(&model, input)?;

        let mut summary = summarize(&request.x_seq);
        summary.processing_time_ms = round2(start.elapsed().as_secs_f64() * 1000.0);

        Ok(PredictionResponse {
            user_id: request.user_id.clone(),
            prediction,
            timestamp: epoch_seconds(),
            input_summary: Some(summary),
        })
    }

    fn forward(
        &self,
        model: &GlucoseLstm,
        input: ValidatedInput,
    ) -> Result<Vec<f32>, ForecastError> {
        let seq_len = input.sequence.len();
        let static_len = input.static_features.len();

        // Single example, one channel per timestep.
        let x_seq = Array3::from_shape_vec((1, seq_len, 1), input.sequence)
            .map_err(|e| ForecastError::Inference(format!("cannot shape x_seq: {}", e)))?;
        let x_static = Array2::from_shape_vec((1, static_len), input.static_features)
            .map_err(|e| ForecastError::Inference(format!("cannot shape x_static: {}", e)))?;

        self.forward_passes.fetch_add(1, Ordering::Relaxed);
        let output = model
            .forward(x_seq.view(), x_static.view())
            .map_err(|e| ForecastError::Inference(e.to_string()))?;

        let prediction: Vec<f32> = output.iter().copied().collect();
        if prediction.len() != model.config().pred_len {
            return Err(ForecastError::Inference(format!(
                "model produced {} values, expected {}",
                prediction.len(),
                model.config().pred_len
            )));
        }
        Ok(prediction)
    }
}

/// Counters for one handler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerStats {
    pub forward_passes: u64,
    pub failures: u64,
}

/// Mean, population standard deviation, min and max of `values`.
///
/// `processing_time_ms` is left at zero for the caller to fill in.
pub fn summarize(values: &[f64]) -> InputSummary {
    if values.is_empty() {
        return InputSummary {
            sequence_mean: 0.0,
            sequence_std: 0.0,
            sequence_min: 0.0,
            sequence_max: 0.0,
            processing_time_ms: 0.0,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    InputSummary {
        sequence_mean: mean,
        sequence_std: variance.sqrt(),
        sequence_min: min,
        sequence_max: max,
        processing_time_ms: 0.0,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
