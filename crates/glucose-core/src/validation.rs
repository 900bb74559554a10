//! Request validation ahead of tensor construction

use crate::error::{ForecastError, InputField};
use crate::model::ModelConfig;
use crate::models::PredictionRequest;

/// Request arrays converted to model precision after passing every check
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub sequence: Vec<f32>,
    pub static_features: Vec<f32>,
}

/// Enforces length and finiteness constraints on prediction requests
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator {
    seq_len: usize,
    static_input_size: usize,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self::for_model(&ModelConfig::default())
    }
}

impl RequestValidator {
    pub fn new(seq_len: usize, static_input_size: usize) -> Self {
        Self {
            seq_len,
            static_input_size,
        }
    }

    pub fn for_model(config: &ModelConfig) -> Self {
        Self::new(config.seq_len, config.static_input_size)
    }

    /// Check both arrays and convert them to f32.
    ///
    /// Shapes are checked before values; the first violation found is
    /// returned. A value that is finite as f64 but overflows f32 counts as
    /// non-finite, since the model would see infinity.
    pub fn validate(&self, request: &PredictionRequest) -> Result<ValidatedInput, ForecastError> {
        check_len(InputField::Sequence, &request.x_seq, self.seq_len)?;
        check_len(InputField::Static, &request.x_static, self.static_input_size)?;

        Ok(ValidatedInput {
            sequence: to_finite_f32(InputField::Sequence, &request.x_seq)?,
            static_features: to_finite_f32(InputField::Static, &request.x_static)?,
        })
    }
}

fn check_len(field: InputField, values: &[f64], expected: usize) -> Result<(), ForecastError> {
    if values.len() != expected {
        return Err(ForecastError::InvalidShape {
            field,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

fn to_finite_f32(field: InputField, values: &[f64]) -> Result<Vec<f32>, ForecastError> {
    values
        .iter()
        .enumerate()
        .map(|(index, &v)| {
            let narrowed = v as f32;
            if v.is_finite() && narrowed.is_finite() {
                Ok(narrowed)
            } else {
                Err(ForecastError::InvalidValue { field, index })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(seq_len: usize, static_len: usize) -> PredictionRequest {
        PredictionRequest {
            x_seq: vec![120.0; seq_len],
            x_static: vec![1.0; static_len],
            user_id: "u1".into(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let input = RequestValidator::default().validate(&request(36, 5)).unwrap();
        assert_eq!(input.sequence.len(), 36);
        assert_eq!(input.static_features.len(), 5);
        assert!(input.sequence.iter().all(|v| *v == 120.0));
    }

    #[test]
    fn test_short_sequence_rejected() {
        let err = RequestValidator::default().validate(&request(35, 5)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidShape {
                field: InputField::Sequence,
                expected: 36,
                actual: 35
            }
        ));
    }

    #[test]
    fn test_long_static_rejected() {
        let err = RequestValidator::default().validate(&request(36, 6)).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidShape {
                field: InputField::Static,
                expected: 5,
                actual: 6
            }
        ));
    }

    #[test]
    fn test_nan_in_sequence_rejected() {
        let mut req = request(36, 5);
        req.x_seq[10] = f64::NAN;
        let err = RequestValidator::default().validate(&req).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidValue {
                field: InputField::Sequence,
                index: 10
            }
        ));
    }

    #[test]
    fn test_infinity_in_static_rejected() {
        let mut req = request(36, 5);
        req.x_static[4] = f64::NEG_INFINITY;
        let err = RequestValidator::default().validate(&req).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidValue {
                field: InputField::Static,
                index: 4
            }
        ));
    }

    #[test]
    fn test_f32_overflow_rejected() {
        let mut req = request(36, 5);
        req.x_seq[0] = 1e300;
        let err = RequestValidator::default().validate(&req).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.code(), "invalid_value");
    }

    #[test]
    fn test_custom_dimensions() {
        let validator = RequestValidator::new(4, 2);
        assert!(validator.validate(&request(4, 2)).is_ok());
        assert!(validator.validate(&request(36, 5)).is_err());
    }
}
