//! Model artifact resolution, deserialization, and caching

mod cache;
mod encoders;
mod onnx;
mod store;

pub use cache::ModelCache;
pub use encoders::{CategoricalEncoder, EncoderMap, LabelCodec, ScalerParams, FALLBACK_CODE};
pub use onnx::OnnxEstimator;
pub use store::FsArtifactStore;

use crate::error::PredictionError;
use crate::models::ModelKind;
use crate::pipeline::predictor::Estimator;
use crate::profiles::ClusterProfileTable;

/// The deserialized artifact set of one model kind.
///
/// Immutable once loaded; shared across concurrent requests behind an `Arc`
/// without further locking.
pub enum ArtifactBundle {
    Segmentation {
        estimator: Box<dyn Estimator>,
        scaler: ScalerParams,
        profiles: ClusterProfileTable,
    },
    Repurchase {
        estimator: Box<dyn Estimator>,
        /// Column order the estimator was fit with.
        feature_columns: Vec<String>,
        encoders: EncoderMap,
    },
    RouteRecommendation {
        estimator: Box<dyn Estimator>,
        /// Label index ↔ route token.
        labels: LabelCodec,
        encoders: EncoderMap,
    },
}

impl ArtifactBundle {
    pub fn kind(&self) -> ModelKind {
        match self {
            ArtifactBundle::Segmentation { .. } => ModelKind::Segmentation,
            ArtifactBundle::Repurchase { .. } => ModelKind::Repurchase,
            ArtifactBundle::RouteRecommendation { .. } => ModelKind::RouteRecommendation,
        }
    }

    pub fn estimator(&self) -> &dyn Estimator {
        match self {
            ArtifactBundle::Segmentation { estimator, .. }
            | ArtifactBundle::Repurchase { estimator, .. }
            | ArtifactBundle::RouteRecommendation { estimator, .. } => estimator.as_ref(),
        }
    }
}

impl std::fmt::Debug for ArtifactBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactBundle")
            .field("kind", &self.kind())
            .field("input_len", &self.estimator().input_len())
            .finish()
    }
}

/// Resolves a model kind to its deserialized artifact bundle.
///
/// Implementations perform no caching; that is [`ModelCache`]'s job.
pub trait ArtifactSource: Send + Sync {
    /// Deserialize the full artifact set for a kind.
    fn load(&self, kind: ModelKind) -> Result<ArtifactBundle, PredictionError>;

    /// Cheap availability check: are the kind's artifacts resolvable right
    /// now? Must not deserialize anything.
    fn probe(&self, kind: ModelKind) -> bool;
}
