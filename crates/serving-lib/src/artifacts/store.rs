//! Filesystem artifact store
//!
//! Resolves each model kind to its file set under a configured base
//! directory and deserializes the files into an [`ArtifactBundle`]. Missing
//! or unreadable files surface as `ArtifactMissing`; files that exist but do
//! not decode surface as `ArtifactCorrupt`.

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::encoders::{EncoderMap, LabelCodec, ScalerParams};
use super::onnx::OnnxEstimator;
use super::{ArtifactBundle, ArtifactSource};
use crate::error::PredictionError;
use crate::models::ModelKind;
use crate::pipeline::features::{ROUTE_FEATURES, SEGMENTATION_FEATURES};
use crate::profiles::ClusterProfileTable;

const MODEL_FILE: &str = "model.onnx";
const SCALER_FILE: &str = "scaler.json";
const PROFILES_FILE: &str = "cluster_profiles.json";
const FEATURE_COLUMNS_FILE: &str = "feature_columns.json";
const ENCODERS_FILE: &str = "encoders.json";
const ROUTE_LABELS_FILE: &str = "route_labels.json";
const FEATURE_ENCODERS_FILE: &str = "feature_encoders.json";

/// Artifact store over a `<base_dir>/<kind>/<file>` layout.
pub struct FsArtifactStore {
    base_dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn kind_dir(&self, kind: ModelKind) -> PathBuf {
        self.base_dir.join(kind.as_str())
    }

    /// Files that must be present for `load` to succeed. The cluster
    /// profile table is display configuration with a built-in default, so
    /// it is not required.
    fn required_files(&self, kind: ModelKind) -> Vec<PathBuf> {
        let dir = self.kind_dir(kind);
        match kind {
            ModelKind::Segmentation => vec![dir.join(MODEL_FILE), dir.join(SCALER_FILE)],
            ModelKind::Repurchase => vec![
                dir.join(MODEL_FILE),
                dir.join(FEATURE_COLUMNS_FILE),
                dir.join(ENCODERS_FILE),
            ],
            ModelKind::RouteRecommendation => vec![
                dir.join(MODEL_FILE),
                dir.join(ROUTE_LABELS_FILE),
                dir.join(FEATURE_ENCODERS_FILE),
            ],
        }
    }

    fn read_bytes(&self, kind: ModelKind, path: &Path) -> Result<Vec<u8>, PredictionError> {
        std::fs::read(path).map_err(|_| PredictionError::ArtifactMissing {
            kind,
            path: path.to_path_buf(),
        })
    }

    fn read_json<T: DeserializeOwned>(
        &self,
        kind: ModelKind,
        path: &Path,
    ) -> Result<T, PredictionError> {
        let bytes = self.read_bytes(kind, path)?;
        serde_json::from_slice(&bytes).map_err(|e| PredictionError::ArtifactCorrupt {
            kind,
            reason: format!("{}: {e}", path.display()),
        })
    }

    fn load_estimator(
        &self,
        kind: ModelKind,
        path: &Path,
        input_len: usize,
    ) -> Result<Box<dyn crate::pipeline::predictor::Estimator>, PredictionError> {
        let bytes = self.read_bytes(kind, path)?;
        let estimator = OnnxEstimator::from_bytes(&bytes, input_len).map_err(|e| {
            PredictionError::ArtifactCorrupt {
                kind,
                reason: format!("{}: {e:#}", path.display()),
            }
        })?;
        Ok(Box::new(estimator))
    }

    fn load_segmentation(&self) -> Result<ArtifactBundle, PredictionError> {
        let kind = ModelKind::Segmentation;
        let dir = self.kind_dir(kind);

        let scaler: ScalerParams = self.read_json(kind, &dir.join(SCALER_FILE))?;
        if !scaler.matches_width(SEGMENTATION_FEATURES.len()) {
            return Err(PredictionError::ArtifactCorrupt {
                kind,
                reason: format!(
                    "scaler width {} does not match the {}-column feature schema",
                    scaler.len(),
                    SEGMENTATION_FEATURES.len()
                ),
            });
        }

        let profiles_path = dir.join(PROFILES_FILE);
        let profiles = if profiles_path.exists() {
            self.read_json(kind, &profiles_path)?
        } else {
            debug!(path = %profiles_path.display(), "No cluster profile file, using built-in table");
            ClusterProfileTable::default()
        };

        let estimator =
            self.load_estimator(kind, &dir.join(MODEL_FILE), SEGMENTATION_FEATURES.len())?;
        Ok(ArtifactBundle::Segmentation {
            estimator,
            scaler,
            profiles,
        })
    }

    fn load_repurchase(&self) -> Result<ArtifactBundle, PredictionError> {
        let kind = ModelKind::Repurchase;
        let dir = self.kind_dir(kind);

        let feature_columns: Vec<String> =
            self.read_json(kind, &dir.join(FEATURE_COLUMNS_FILE))?;
        if feature_columns.is_empty() {
            return Err(PredictionError::ArtifactCorrupt {
                kind,
                reason: "empty feature column list".to_string(),
            });
        }
        let encoders: EncoderMap = self.read_json(kind, &dir.join(ENCODERS_FILE))?;

        let estimator = self.load_estimator(kind, &dir.join(MODEL_FILE), feature_columns.len())?;
        Ok(ArtifactBundle::Repurchase {
            estimator,
            feature_columns,
            encoders,
        })
    }

    fn load_route(&self) -> Result<ArtifactBundle, PredictionError> {
        let kind = ModelKind::RouteRecommendation;
        let dir = self.kind_dir(kind);

        let labels: LabelCodec = self.read_json(kind, &dir.join(ROUTE_LABELS_FILE))?;
        if labels.is_empty() {
            return Err(PredictionError::ArtifactCorrupt {
                kind,
                reason: "empty route label space".to_string(),
            });
        }
        let encoders: EncoderMap = self.read_json(kind, &dir.join(FEATURE_ENCODERS_FILE))?;

        let estimator = self.load_estimator(kind, &dir.join(MODEL_FILE), ROUTE_FEATURES.len())?;
        Ok(ArtifactBundle::RouteRecommendation {
            estimator,
            labels,
            encoders,
        })
    }
}

impl ArtifactSource for FsArtifactStore {
    fn load(&self, kind: ModelKind) -> Result<ArtifactBundle, PredictionError> {
        debug!(%kind, dir = %self.kind_dir(kind).display(), "Loading model artifacts");
        match kind {
            ModelKind::Segmentation => self.load_segmentation(),
            ModelKind::Repurchase => self.load_repurchase(),
            ModelKind::RouteRecommendation => self.load_route(),
        }
    }

    fn probe(&self, kind: ModelKind) -> bool {
        self.required_files(kind).iter().all(|p| p.is_file())
    }
}
