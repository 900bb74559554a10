//! Core library for short-horizon glucose forecasting
//!
//! This crate provides:
//! - The recurrent sequence-to-vector forecast network and its weight format
//! - A lazily loading, process-wide model registry
//! - Request validation and the prediction pipeline
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod inference;
pub mod model;
pub mod models;
pub mod observability;
pub mod registry;
pub mod validation;

pub use error::{ForecastError, InputField};
pub use health::{HealthReporter, HealthResponse, HealthStatus};
pub use inference::{HandlerStats, InferenceHandler};
pub use model::{GlucoseLstm, Mode, ModelConfig, ModelError};
pub use models::*;
pub use observability::{ForecastMetrics, StructuredLogger, MALFORMED_REQUEST_CODE};
pub use registry::ModelRegistry;
pub use validation::RequestValidator;
