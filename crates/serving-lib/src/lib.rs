//! Serving library for the trip prediction models
//!
//! This crate provides the core functionality for:
//! - Artifact resolution and deserialization (estimators, encoders, scaler)
//! - Process-wide lazy model caching
//! - Per-model-kind feature construction
//! - Estimator invocation and response shaping
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod profiles;

pub use artifacts::{ArtifactBundle, ArtifactSource, FsArtifactStore, ModelCache};
pub use error::PredictionError;
pub use health::{HealthReport, ServiceStatus};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use pipeline::PredictionPipeline;
pub use profiles::{ClusterProfile, ClusterProfileTable};
