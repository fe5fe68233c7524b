//! Pricing server - used-vehicle price prediction over HTTP
//!
//! Loads the trained pipeline and lookup tables once at startup, then serves
//! `POST /predict` alongside health and metrics endpoints.

use anyhow::{Context, Result};
use pricing_lib::{
    health::HealthRegistry,
    load_artifacts,
    observability::{ServiceMetrics, StructuredLogger},
    FeatureBuilder, PredictionService,
};
use pricing_server::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_NAME: &str = "pricing-server";
const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting {}", SERVICE_NAME);

    let config = ServiceConfig::load()?;
    info!(
        artifacts_dir = %config.artifacts_dir.display(),
        reference_year = config.reference_year,
        "Service configured"
    );
    if config.reference_year != pricing_lib::predictor::REFERENCE_YEAR {
        warn!(
            reference_year = config.reference_year,
            "Reference year differs from the year the model was trained against"
        );
    }

    let logger = StructuredLogger::new(SERVICE_NAME);

    // Missing or corrupt artifacts abort startup; nothing is served without them.
    let artifacts = load_artifacts(&config.artifacts_dir).with_context(|| {
        format!(
            "Failed to load artifacts from {}",
            config.artifacts_dir.display()
        )
    })?;
    let model_version = artifacts.model_version.clone();

    let metrics = ServiceMetrics::new();
    metrics.set_model_version(&model_version);

    let table_sizes = artifacts.tables.sizes();
    let health_registry = HealthRegistry::new();
    health_registry.record_artifacts(&table_sizes).await;

    let mut lookup_entries = 0;
    for (table, entries) in table_sizes {
        metrics.set_lookup_entries(table, entries);
        lookup_entries += entries;
        if entries == 0 {
            warn!(table = table, "Lookup table is empty, every lookup falls back to defaults");
        }
    }
    logger.log_artifacts_loaded(
        &config.artifacts_dir.display().to_string(),
        &model_version,
        lookup_entries,
    );

    let builder = FeatureBuilder::new(Arc::new(artifacts.tables), config.reference_year);
    let service = PredictionService::new(
        builder,
        Arc::new(artifacts.pipeline),
        metrics.clone(),
        logger.clone(),
    );

    let app_state = Arc::new(api::AppState::new(
        Arc::new(service),
        health_registry,
        metrics,
    ));

    let addr = config.bind_addr();
    logger.log_startup(SERVICE_VERSION, &model_version, &addr);

    let shutdown_logger = logger.clone();
    api::serve(&addr, app_state, &config.allowed_origins(), async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
