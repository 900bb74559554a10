//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Location of the SafeTensors weights file
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_model_path() -> PathBuf {
    PathBuf::from("glucose_lstm.safetensors")
}

fn default_port() -> u16 {
    8000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            port: default_port(),
            host: default_host(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    /// (`MODEL_PATH`, `PORT`, `HOST`)
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::default().try_parsing(true))
    }

    /// Load configuration from an explicit environment source
    pub fn from_env(source: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(source)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid server configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default()
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_env(env(&[])).unwrap();
        assert_eq!(config.model_path, PathBuf::from("glucose_lstm.safetensors"));
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_environment_overrides() {
        let config = ServerConfig::from_env(env(&[
            ("MODEL_PATH", "/models/lstm.safetensors"),
            ("PORT", "9100"),
        ]))
        .unwrap();

        assert_eq!(config.model_path, PathBuf::from("/models/lstm.safetensors"));
        assert_eq!(config.port, 9100);
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(ServerConfig::from_env(env(&[("PORT", "not-a-port")])).is_err());
    }
}
