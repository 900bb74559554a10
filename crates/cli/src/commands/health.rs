//! Health command

use crate::client::ApiClient;
use crate::output::{color_status, format_timestamp, print_json, OutputFormat};
use anyhow::Result;
use colored::Colorize;

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let status = if health.status.is_ok() { "ok" } else { "error" };

            println!("{}", "Service Health".bold().underline());
            println!();
            println!("  {:<12} {}", "Status:", color_status(status));
            println!("  {:<12} {}", "Version:", health.version);
            println!("  {:<12} {}", "Checked:", format_timestamp(health.timestamp));
        }
    }

    if !health.status.is_ok() {
        anyhow::bail!("model is not available");
    }

    Ok(())
}
