//! Service configuration

use anyhow::{Context, Result};
use pricing_lib::predictor::REFERENCE_YEAR;
use serde::Deserialize;
use std::path::PathBuf;

/// Origins of the local frontend dev server
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the model and lookup-table artifacts
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Deployed frontend origin allowed by CORS
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Year car age is measured against
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("./artifacts")
}

fn default_frontend_url() -> String {
    std::env::var("FRONTEND_URL").unwrap_or_else(|_| DEV_ORIGINS[0].to_string())
}

fn default_reference_year() -> i32 {
    REFERENCE_YEAR
}

impl ServiceConfig {
    /// Load configuration from an optional `pricing.toml` and `PRICING_*` environment variables
    pub fn load() -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("pricing").required(false))
            .add_source(config::Environment::with_prefix("PRICING"));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config = builder.build().context("Failed to read configuration")?;
        config
            .try_deserialize()
            .context("Invalid service configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// CORS allow-list: the two dev origins plus the deployed frontend
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
        let frontend = self.frontend_url.trim().trim_end_matches('/');
        if !frontend.is_empty() && !origins.iter().any(|o| o == frontend) {
            origins.push(frontend.to_string());
        }
        origins
    }
}
