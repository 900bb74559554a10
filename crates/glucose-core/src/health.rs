//! Health reporting for the forecast service
//!
//! A health check asks the model registry for an instance without running a
//! prediction. The check itself always answers: a registry failure turns
//! into an `error` status rather than an error return.

use crate::models::epoch_seconds;
use crate::observability::StructuredLogger;
use crate::registry::ModelRegistry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Overall service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// A model instance is available
    Ok,
    /// The model could not be produced
    Error,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    /// Epoch seconds
    pub timestamp: f64,
}

/// Probes the registry and reports process health
#[derive(Debug, Clone)]
pub struct HealthReporter {
    registry: Arc<ModelRegistry>,
    version: String,
    logger: StructuredLogger,
}

impl HealthReporter {
    pub fn new(
        registry: Arc<ModelRegistry>,
        version: impl Into<String>,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            registry,
            version: version.into(),
            logger,
        }
    }

    /// Check whether a model instance can be produced
    pub fn check(&self) -> HealthResponse {
        let status = match self.registry.get() {
            Ok(_) => HealthStatus::Ok,
            Err(e) => {
                self.logger.log_health_check_failed(&e);
                HealthStatus::Error
            }
        };

        HealthResponse {
            status,
            version: self.version.clone(),
            timestamp: epoch_seconds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{write_weights, GlucoseLstm, ModelConfig};
    use crate::observability::ForecastMetrics;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn reporter(path: PathBuf) -> HealthReporter {
        let logger = StructuredLogger::new("test");
        let registry = Arc::new(ModelRegistry::new(path, ForecastMetrics::new(), logger.clone()));
        HealthReporter::new(registry, "1.0.0", logger)
    }

    #[test]
    fn test_health_ok_with_compatible_weights() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glucose_lstm.safetensors");
        write_weights(&path, &GlucoseLstm::random(ModelConfig::default(), 4).to_tensors()).unwrap();

        let health = reporter(path).check();
        assert_eq!(health.status, HealthStatus::Ok);
        assert_eq!(health.version, "1.0.0");
        assert!(health.timestamp > 0.0);
    }

    #[test]
    fn test_health_error_when_weights_missing() {
        let dir = TempDir::new().unwrap();
        let health = reporter(dir.path().join("absent.safetensors")).check();

        assert_eq!(health.status, HealthStatus::Error);
        assert!(!health.status.is_ok());
    }

    #[test]
    fn test_health_error_when_weights_incompatible() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("glucose_lstm.safetensors");
        let other = ModelConfig {
            num_layers: 1,
            ..ModelConfig::default()
        };
        write_weights(&path, &GlucoseLstm::random(other, 4).to_tensors()).unwrap();

        assert_eq!(reporter(path).check().status, HealthStatus::Error);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Ok).unwrap(), "\"ok\"");
        assert_eq!(serde_json::to_string(&HealthStatus::Error).unwrap(), "\"error\"");
    }
}
