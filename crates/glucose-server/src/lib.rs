//! HTTP front end for the glucose forecast service

pub mod api;
pub mod config;

/// Service name attached to structured log events
pub const SERVICE_NAME: &str = "glucose-forecast";

/// Version reported by `/health`
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
