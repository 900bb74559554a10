//! Glucose forecast server
//!
//! Serves short-horizon glucose forecasts over HTTP from a single
//! pre-trained model loaded on first use.

use anyhow::Result;
use glucose_core::{
    ForecastMetrics, HealthReporter, InferenceHandler, ModelRegistry, StructuredLogger,
};
use glucose_server::{api, config::ServerConfig, SERVICE_NAME, SERVICE_VERSION};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting glucose-server");

    let config = ServerConfig::load()?;
    info!(model_path = %config.model_path.display(), port = config.port, "Server configured");

    let metrics = ForecastMetrics::new();
    let logger = StructuredLogger::new(SERVICE_NAME);

    // The registry is the only owner of the model; everything else reaches
    // it through these handles.
    let registry = Arc::new(ModelRegistry::new(
        config.model_path.clone(),
        metrics.clone(),
        logger.clone(),
    ));
    let handler = Arc::new(InferenceHandler::new(
        Arc::clone(&registry),
        metrics.clone(),
        logger.clone(),
    ));
    let health = HealthReporter::new(registry, SERVICE_VERSION, logger.clone());
    let app_state = Arc::new(api::AppState::new(handler, health, metrics));

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &addr, &config.model_path);

    api::serve(&addr, app_state, shutdown_signal()).await?;

    logger.log_shutdown("signal received");
    info!("Shutting down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(cause = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(cause = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
