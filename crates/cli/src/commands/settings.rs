//! Config command

use crate::config::Config;
use crate::output::{print_info, print_json, print_success, OutputFormat};
use anyhow::{Context, Result};
use serde_json::json;

pub fn show_settings(config: &Config, effective_url: &str, format: OutputFormat) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unavailable)".to_string());

    match format {
        OutputFormat::Json => print_json(&json!({
            "config_path": path,
            "api_url": config.api_url,
            "effective_api_url": effective_url,
        }))?,
        OutputFormat::Table => {
            println!("  {:<16} {}", "Config file:", path);
            println!(
                "  {:<16} {}",
                "Saved API URL:",
                config.api_url.as_deref().unwrap_or("(not set)")
            );
            println!("  {:<16} {}", "Effective URL:", effective_url);
        }
    }

    Ok(())
}

pub fn set_api_url(mut config: Config, url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API URL: {}", url))?;

    config.api_url = Some(url.to_string());
    let path = config.save()?;

    print_success(&format!("API URL set to {}", url));
    print_info(&format!("Saved to {}", path.display()));
    Ok(())
}
