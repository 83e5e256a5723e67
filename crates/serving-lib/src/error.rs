//! Error taxonomy for the prediction pipeline

use crate::models::ModelKind;
use std::path::PathBuf;
use thiserror::Error;

/// Failures a prediction request can surface to the caller.
///
/// Encoding fallbacks (unseen categorical values, malformed timestamps) are
/// deliberately not represented here: they are absorbed during feature
/// construction and logged, never returned.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// A required field is missing or has the wrong shape. Rejected before
    /// the record reaches the model.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A required artifact file is absent or unreadable.
    #[error("artifact missing for {kind}: {}", .path.display())]
    ArtifactMissing { kind: ModelKind, path: PathBuf },

    /// An artifact file exists but cannot be deserialized.
    #[error("artifact corrupt for {kind}: {reason}")]
    ArtifactCorrupt { kind: ModelKind, reason: String },

    /// Feature vector and estimator disagree on the input contract, or the
    /// estimator produced an unusable output. An internal defect, fatal to
    /// the current request only.
    #[error("inference contract violation: {0}")]
    Inference(String),
}

impl PredictionError {
    /// Stable category token used in the wire error shape and in metrics
    /// labels.
    pub fn category(&self) -> &'static str {
        match self {
            PredictionError::Validation(_) => "validation",
            PredictionError::ArtifactMissing { .. } => "artifact_missing",
            PredictionError::ArtifactCorrupt { .. } => "artifact_corrupt",
            PredictionError::Inference(_) => "inference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_stable() {
        let missing = PredictionError::ArtifactMissing {
            kind: ModelKind::Segmentation,
            path: PathBuf::from("/tmp/none"),
        };
        assert_eq!(missing.category(), "artifact_missing");
        assert_eq!(
            PredictionError::Validation("x".into()).category(),
            "validation"
        );
        assert_eq!(
            PredictionError::Inference("x".into()).category(),
            "inference"
        );
    }

    #[test]
    fn test_display_includes_kind() {
        let err = PredictionError::ArtifactCorrupt {
            kind: ModelKind::RouteRecommendation,
            reason: "bad graph".into(),
        };
        assert!(err.to_string().contains("route_recommendation"));
    }
}
