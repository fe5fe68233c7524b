//! Server health and CLI configuration commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::config::Config;
use crate::output::{color_status, print_info, OutputFormat};

/// Row for the components table
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show server health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.health().await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("{} {}", "Server Health:".bold(), color_status(&result.status));
            println!();

            let mut components: Vec<_> = result.components.into_iter().collect();
            components.sort_by(|a, b| a.0.cmp(&b.0));

            let rows: Vec<ComponentRow> = components
                .into_iter()
                .map(|(name, component)| ComponentRow {
                    name,
                    status: color_status(&component.status),
                    message: component.message.unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

/// Show the effective configuration
pub fn show_config(saved: &Config, api_url: &str, format: OutputFormat) -> Result<()> {
    let path = Config::config_path()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&serde_json::json!({
                "api_url": api_url,
                "saved": saved,
                "config_path": path.display().to_string(),
            }))?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("API URL:     {}", api_url.cyan());
            println!("Config file: {}", path.display());
            if saved.api_url.is_none() {
                print_info("No API URL saved; use `carprice config set-api-url <URL>`");
            }
        }
    }

    Ok(())
}
