//! Error taxonomy for the forecast pipeline
//!
//! Every failure a prediction request can hit is one of four kinds. Client
//! faults (shape, value) are detected before the model is touched; server
//! faults (load, inference) carry their underlying cause for logging but are
//! reported to callers with a generic message.

use crate::model::ModelError;
use thiserror::Error;

/// Which request array an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Sequence,
    Static,
}

impl InputField {
    /// Wire name of the field
    pub fn as_str(&self) -> &'static str {
        match self {
            InputField::Sequence => "x_seq",
            InputField::Static => "x_static",
        }
    }
}

impl std::fmt::Display for InputField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("{field} must contain exactly {expected} values, got {actual}")]
    InvalidShape {
        field: InputField,
        expected: usize,
        actual: usize,
    },

    #[error("{field} contains a non-finite value at index {index}")]
    InvalidValue { field: InputField, index: usize },

    #[error("failed to load model: {0}")]
    ModelLoad(#[source] ModelError),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ForecastError {
    /// Returns true when the caller sent a bad request
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ForecastError::InvalidShape { .. } | ForecastError::InvalidValue { .. }
        )
    }

    /// Stable machine-readable code, used in responses and metric labels
    pub fn code(&self) -> &'static str {
        match self {
            ForecastError::InvalidShape { .. } => "invalid_shape",
            ForecastError::InvalidValue { .. } => "invalid_value",
            ForecastError::ModelLoad(_) => "model_unavailable",
            ForecastError::Inference(_) => "inference_failed",
        }
    }

    /// Message that is safe to hand back to a client.
    ///
    /// Client faults describe what was wrong with the input; server faults
    /// never leak the internal cause.
    pub fn public_message(&self) -> String {
        match self {
            ForecastError::InvalidShape { .. } | ForecastError::InvalidValue { .. } => {
                self.to_string()
            }
            ForecastError::ModelLoad(_) => "Model is unavailable".to_string(),
            ForecastError::Inference(_) => "Prediction failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        let shape = ForecastError::InvalidShape {
            field: InputField::Sequence,
            expected: 36,
            actual: 35,
        };
        let value = ForecastError::InvalidValue {
            field: InputField::Static,
            index: 2,
        };
        let load = ForecastError::ModelLoad(ModelError::MissingTensor("fc.0.weight".into()));
        let inference = ForecastError::Inference("boom".into());

        assert!(shape.is_client_error());
        assert!(value.is_client_error());
        assert!(!load.is_client_error());
        assert!(!inference.is_client_error());
    }

    #[test]
    fn test_server_errors_hide_cause() {
        let load = ForecastError::ModelLoad(ModelError::MissingTensor("fc.0.weight".into()));
        assert!(!load.public_message().contains("fc.0.weight"));
        assert!(load.to_string().contains("fc.0.weight"));

        let inference = ForecastError::Inference("secret detail".into());
        assert_eq!(inference.public_message(), "Prediction failed");
    }

    #[test]
    fn test_shape_message_names_field() {
        let err = ForecastError::InvalidShape {
            field: InputField::Static,
            expected: 5,
            actual: 4,
        };
        assert_eq!(err.public_message(), "x_static must contain exactly 5 values, got 4");
        assert_eq!(err.code(), "invalid_shape");
    }
}
