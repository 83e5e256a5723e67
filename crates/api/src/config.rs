//! Service configuration

use anyhow::Result;
use serde::Deserialize;

/// Prediction service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Base directory holding the per-kind model artifact sets
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,

    /// Eagerly load all model kinds at startup instead of on first request
    #[serde(default = "default_preload_models")]
    pub preload_models: bool,
}

fn default_api_port() -> u16 {
    8080
}

fn default_artifact_dir() -> String {
    std::env::var("ARTIFACT_DIR").unwrap_or_else(|_| "artifacts".to_string())
}

fn default_preload_models() -> bool {
    false
}

impl ServiceConfig {
    /// Load configuration from environment variables (PREDICT_ prefix)
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PREDICT"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServiceConfig {
            api_port: default_api_port(),
            artifact_dir: default_artifact_dir(),
            preload_models: default_preload_models(),
        }))
    }
}
