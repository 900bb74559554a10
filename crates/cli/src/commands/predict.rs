//! Predict command

use crate::client::ApiClient;
use crate::output::{format_timestamp, print_info, print_json, OutputFormat};
use anyhow::{Context, Result};
use colored::Colorize;
use glucose_core::{PredictionRequest, PredictionResponse, RequestValidator};
use serde::Deserialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Minutes between consecutive forecast steps
const STEP_MINUTES: usize = 5;

/// Shape of a `--input` file
#[derive(Debug, Deserialize)]
struct InputFile {
    x_seq: Vec<f64>,
    x_static: Vec<f64>,
}

#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Step")]
    step: usize,
    #[tabled(rename = "Horizon")]
    horizon: String,
    #[tabled(rename = "Glucose")]
    value: String,
}

/// Assemble a request from either an input file or the inline CSV flags,
/// rejecting payloads the service would refuse anyway.
pub fn build_request(
    user_id: String,
    input: Option<&Path>,
    seq: Vec<f64>,
    static_features: Vec<f64>,
) -> Result<PredictionRequest> {
    let (x_seq, x_static) = match input {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file: InputFile = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            (file.x_seq, file.x_static)
        }
        None => {
            if seq.is_empty() || static_features.is_empty() {
                anyhow::bail!("provide either --input <file> or both --seq and --static");
            }
            (seq, static_features)
        }
    };

    let request = PredictionRequest {
        x_seq,
        x_static,
        user_id,
    };

    RequestValidator::default()
        .validate(&request)
        .map_err(|e| anyhow::anyhow!(e.public_message()))?;

    Ok(request)
}

pub async fn run_prediction(
    client: &ApiClient,
    request: &PredictionRequest,
    format: OutputFormat,
) -> Result<()> {
    let response = client.predict(request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => print_forecast(&response),
    }

    Ok(())
}

fn print_forecast(response: &PredictionResponse) {
    println!(
        "{} {}",
        "Forecast for".bold(),
        response.user_id.cyan().bold()
    );
    println!();

    let rows: Vec<ForecastRow> = response
        .prediction
        .iter()
        .enumerate()
        .map(|(i, value)| ForecastRow {
            step: i + 1,
            horizon: format!("+{} min", (i + 1) * STEP_MINUTES),
            value: format!("{:.2}", value),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    if let Some(summary) = &response.input_summary {
        println!();
        println!("{}", "Input Summary".bold().underline());
        println!("  {:<10} {:.2}", "Mean:", summary.sequence_mean);
        println!("  {:<10} {:.2}", "Std:", summary.sequence_std);
        println!("  {:<10} {:.2}", "Min:", summary.sequence_min);
        println!("  {:<10} {:.2}", "Max:", summary.sequence_max);
        println!("  {:<10} {:.2} ms", "Took:", summary.processing_time_ms);
    }

    println!();
    print_info(&format!("Generated at {}", format_timestamp(response.timestamp)));
}
