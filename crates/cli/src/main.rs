//! Glucose Forecast CLI
//!
//! A command-line tool for requesting forecasts from, and checking the
//! health of, the glucose forecast service.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, predict, settings};
use std::path::PathBuf;

/// Glucose Forecast CLI
#[derive(Parser)]
#[command(name = "gfc")]
#[command(author, version, about = "CLI for the Glucose Forecast service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GFC_API_URL env var)
    #[arg(long, env = "GFC_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check service health
    Health,

    /// Request a glucose forecast
    Predict {
        /// User identifier echoed back by the service
        #[arg(long)]
        user_id: String,

        /// JSON file containing "x_seq" and "x_static" arrays
        #[arg(long, short, conflicts_with_all = ["seq", "static_features"])]
        input: Option<PathBuf>,

        /// Comma-separated glucose readings, oldest first
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        seq: Vec<f64>,

        /// Comma-separated static patient features
        #[arg(long = "static", value_delimiter = ',', allow_hyphen_values = true)]
        static_features: Vec<f64>,
    },

    /// Manage CLI settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings
    Show,

    /// Persist the default API endpoint
    SetApiUrl {
        /// API endpoint URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let flag_url = cli.api_url.as_deref();

    match &cli.command {
        Commands::Health => {
            let client = client::ApiClient::new(&resolve_api_url(flag_url))?;
            health::show_health(&client, cli.format).await?;
        }
        Commands::Predict {
            user_id,
            input,
            seq,
            static_features,
        } => {
            let request = predict::build_request(
                user_id.clone(),
                input.as_deref(),
                seq.clone(),
                static_features.clone(),
            )?;
            let client = client::ApiClient::new(&resolve_api_url(flag_url))?;
            predict::run_prediction(&client, &request, cli.format).await?;
        }
        Commands::Config(config_cmd) => {
            let settings_file = config::Config::load_or_default();
            match config_cmd {
                ConfigCommands::Show => {
                    let effective = settings_file.resolve_api_url(flag_url);
                    settings::show_settings(&settings_file, &effective, cli.format)?;
                }
                ConfigCommands::SetApiUrl { url } => {
                    settings::set_api_url(settings_file, url)?;
                }
            }
        }
    }

    Ok(())
}

/// An explicit `--api-url`/`GFC_API_URL` wins without touching the config file
fn resolve_api_url(flag: Option<&str>) -> String {
    match flag {
        Some(url) => url.to_string(),
        None => config::Config::load_or_default().resolve_api_url(None),
    }
}
