//! Prediction API - serves the three trip prediction models over HTTP
//!
//! Loads pre-fitted model artifacts lazily (or eagerly with
//! PREDICT_PRELOAD_MODELS=true) and exposes one prediction operation per
//! model kind plus health and metrics endpoints.

use anyhow::Result;
use serving_lib::{
    FsArtifactStore, ModelCache, ModelKind, PredictionPipeline, ServiceMetrics, StructuredLogger,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting prediction-api");

    // Load configuration
    let config = config::ServiceConfig::load()?;
    info!(artifact_dir = %config.artifact_dir, "Service configured");

    // Wire up the pipeline: store -> cache -> pipeline
    let store = Arc::new(FsArtifactStore::new(&config.artifact_dir));
    let cache = Arc::new(ModelCache::new(store));
    let pipeline = Arc::new(PredictionPipeline::new(cache));

    // Initialize metrics
    let metrics = ServiceMetrics::new();
    metrics.set_service_version(SERVICE_VERSION);

    // Initialize structured logger
    let logger = StructuredLogger::new("prediction-api");
    logger.log_startup(SERVICE_VERSION, &config.artifact_dir);

    // Optional warm-up: load every kind now so the first request of each
    // model pays no deserialization latency. A failed load is logged and
    // retried on first request, it never aborts startup.
    if config.preload_models {
        for kind in ModelKind::ALL {
            let loaded = pipeline.cache().get(kind).await.is_ok();
            logger.log_warmup(kind, loaded);
        }
    }

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(pipeline));

    // Start the HTTP server
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");
    api_handle.abort();

    Ok(())
}
