//! Estimator invocation
//!
//! Runs the loaded estimator on a finished feature vector and interprets the
//! raw score row per model kind. A vector/estimator width mismatch is a
//! programming error in feature construction, not a user error.

use crate::artifacts::ArtifactBundle;
use crate::error::PredictionError;
use crate::models::{FeatureVector, RawScores};

/// A loaded, immutable estimator. Implementations must be safe to share
/// across concurrent requests.
pub trait Estimator: Send + Sync {
    /// Number of input columns the estimator was fit with.
    fn input_len(&self) -> usize;

    /// Score a single feature row, returning the raw output row.
    fn score(&self, features: &[f32]) -> Result<Vec<f32>, PredictionError>;
}

/// Invoke the bundle's estimator and interpret its output.
pub fn run(bundle: &ArtifactBundle, features: &FeatureVector) -> Result<RawScores, PredictionError> {
    let estimator = bundle.estimator();
    if features.len() != estimator.input_len() {
        return Err(PredictionError::Inference(format!(
            "feature vector has {} columns, {} estimator expects {}",
            features.len(),
            bundle.kind(),
            estimator.input_len()
        )));
    }

    let scores = estimator.score(features)?;
    match bundle {
        ArtifactBundle::Segmentation { .. } => {
            let cluster = argmin(&scores).ok_or_else(|| {
                PredictionError::Inference("segmentation estimator returned no distances".into())
            })?;
            Ok(RawScores::Segmentation {
                cluster,
                distances: scores,
            })
        }
        ArtifactBundle::Repurchase { .. } => {
            // Positive-class probability is the last entry of the row,
            // whether the export is [p] or [p_negative, p_positive].
            let probability = scores.last().copied().ok_or_else(|| {
                PredictionError::Inference("classifier returned no probabilities".into())
            })?;
            Ok(RawScores::Repurchase {
                probability: probability.clamp(0.0, 1.0),
            })
        }
        ArtifactBundle::RouteRecommendation { labels, .. } => {
            if scores.len() != labels.len() {
                return Err(PredictionError::Inference(format!(
                    "route distribution has {} entries, label space has {}",
                    scores.len(),
                    labels.len()
                )));
            }
            Ok(RawScores::RouteRecommendation {
                distribution: scores,
            })
        }
    }
}

fn argmin(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(index, _)| index)
}
