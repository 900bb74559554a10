//! Lazily loaded, process-wide model instance
//!
//! The registry owns the only live [`GlucoseLstm`]. The first successful
//! [`ModelRegistry::get`] loads the weights, switches the network to
//! inference mode and caches it; later calls hand out the cached instance.
//! Failed loads are never cached, so every call after a failure retries from
//! scratch.

use crate::error::ForecastError;
use crate::model::{read_weights, GlucoseLstm, ModelConfig, ModelError};
use crate::observability::{ForecastMetrics, StructuredLogger};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;
use tracing::debug;

pub struct ModelRegistry {
    model_path: PathBuf,
    config: ModelConfig,
    cached: RwLock<Option<Arc<GlucoseLstm>>>,
    load_attempts: AtomicU64,
    metrics: ForecastMetrics,
    logger: StructuredLogger,
}

impl ModelRegistry {
    /// Registry for the default architecture, loading from `model_path`
    pub fn new(
        model_path: impl Into<PathBuf>,
        metrics: ForecastMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            config: ModelConfig::default(),
            cached: RwLock::new(None),
            load_attempts: AtomicU64::new(0),
            metrics,
            logger,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Returns the cached model, loading it first if needed.
    ///
    /// Concurrent first calls are serialized on the write lock, and the
    /// cache is re-checked under it, so weights are read at most once per
    /// successful load.
    pub fn get(&self) -> Result<Arc<GlucoseLstm>, ForecastError> {
        if let Some(model) = self.cached() {
            return Ok(model);
        }

        let mut slot = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = slot.as_ref() {
            debug!("Model loaded by a concurrent caller");
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(self.load().map_err(ForecastError::ModelLoad)?);
        *slot = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Whether a model instance is currently cached
    pub fn is_loaded(&self) -> bool {
        self.cached().is_some()
    }

    /// Number of times weights have been read from disk
    pub fn load_attempts(&self) -> u64 {
        self.load_attempts.load(Ordering::Relaxed)
    }

    fn cached(&self) -> Option<Arc<GlucoseLstm>> {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn load(&self) -> Result<GlucoseLstm, ModelError> {
        self.load_attempts.fetch_add(1, Ordering::Relaxed);
        self.metrics.inc_model_load_attempts();
        let start = Instant::now();

        let loaded = read_weights(&self.model_path).and_then(|weights| {
            let mut model = GlucoseLstm::from_tensors(self.config, weights.tensors)?;
            model.eval();
            Ok((model, weights.sha256, weights.size_bytes))
        });

        match loaded {
            Ok((model, sha256, size_bytes)) => {
                let load_ms = start.elapsed().as_secs_f64() * 1000.0;
                self.logger
                    .log_model_loaded(&self.model_path, &sha256, size_bytes, load_ms);
                self.metrics.set_model_loaded(true);
                Ok(model)
            }
            Err(e) => {
                self.logger.log_model_load_failed(&self.model_path, &e);
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("model_path", &self.model_path)
            .field("loaded", &self.is_loaded())
            .field("load_attempts", &self.load_attempts())
            .finish()
    }
}
