//! Health reporting for the prediction service
//!
//! Reports whether each model kind's artifacts are resolvable and which
//! kinds are currently cached, without ever forcing a load.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::artifacts::ModelCache;
use crate::models::ModelKind;

/// Overall service status derived from per-kind artifact availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// All model kinds are resolvable
    Healthy,
    /// Some model kinds are resolvable
    Degraded,
    /// No model kind is resolvable
    Unhealthy,
}

impl ServiceStatus {
    /// Returns true if at least one model can be served
    pub fn is_operational(&self) -> bool {
        matches!(self, ServiceStatus::Healthy | ServiceStatus::Degraded)
    }
}

/// Snapshot of the model cache contents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheState {
    pub loaded_kinds: Vec<ModelKind>,
    pub count: usize,
}

/// Health response for the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub models: BTreeMap<String, bool>,
    pub cache: CacheState,
}

impl HealthReport {
    /// Probe every model kind and snapshot the cache.
    pub fn collect(cache: &ModelCache) -> Self {
        let models: BTreeMap<String, bool> = ModelKind::ALL
            .iter()
            .map(|&kind| (kind.as_str().to_string(), cache.probe(kind)))
            .collect();
        let status = Self::compute_status(&models);
        let loaded_kinds = cache.loaded_kinds();
        HealthReport {
            status,
            models,
            cache: CacheState {
                count: loaded_kinds.len(),
                loaded_kinds,
            },
        }
    }

    /// Compute overall status from per-kind availability
    pub fn compute_status(models: &BTreeMap<String, bool>) -> ServiceStatus {
        let available = models.values().filter(|&&up| up).count();
        if available == models.len() {
            ServiceStatus::Healthy
        } else if available > 0 {
            ServiceStatus::Degraded
        } else {
            ServiceStatus::Unhealthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactBundle, ArtifactSource, EncoderMap};
    use crate::error::PredictionError;
    use crate::pipeline::Estimator;
    use std::sync::Arc;

    struct FixedEstimator;
    impl Estimator for FixedEstimator {
        fn input_len(&self) -> usize {
            1
        }
        fn score(&self, _features: &[f32]) -> Result<Vec<f32>, PredictionError> {
            Ok(vec![0.5])
        }
    }

    /// Source where only the listed kinds are resolvable.
    struct PartialSource {
        available: Vec<ModelKind>,
    }

    impl ArtifactSource for PartialSource {
        fn load(&self, kind: ModelKind) -> Result<ArtifactBundle, PredictionError> {
            if !self.available.contains(&kind) {
                return Err(PredictionError::ArtifactMissing {
                    kind,
                    path: "/nowhere".into(),
                });
            }
            Ok(ArtifactBundle::Repurchase {
                estimator: Box::new(FixedEstimator),
                feature_columns: vec!["a".to_string()],
                encoders: EncoderMap::new(),
            })
        }

        fn probe(&self, kind: ModelKind) -> bool {
            self.available.contains(&kind)
        }
    }

    fn cache_with(available: Vec<ModelKind>) -> ModelCache {
        ModelCache::new(Arc::new(PartialSource { available }))
    }

    #[test]
    fn test_all_available_is_healthy() {
        let cache = cache_with(ModelKind::ALL.to_vec());
        let report = HealthReport::collect(&cache);
        assert_eq!(report.status, ServiceStatus::Healthy);
        assert!(report.models.values().all(|&up| up));
        assert_eq!(report.models.len(), 3);
    }

    #[test]
    fn test_partial_availability_is_degraded() {
        let cache = cache_with(vec![ModelKind::Segmentation]);
        let report = HealthReport::collect(&cache);
        assert_eq!(report.status, ServiceStatus::Degraded);
        assert!(report.status.is_operational());
        assert_eq!(report.models["segmentation"], true);
        assert_eq!(report.models["repurchase"], false);
    }

    #[test]
    fn test_nothing_available_is_unhealthy() {
        let cache = cache_with(Vec::new());
        let report = HealthReport::collect(&cache);
        assert_eq!(report.status, ServiceStatus::Unhealthy);
        assert!(!report.status.is_operational());
    }

    #[tokio::test]
    async fn test_cache_state_reflects_loads() {
        let cache = cache_with(ModelKind::ALL.to_vec());
        let report = HealthReport::collect(&cache);
        assert_eq!(report.cache.count, 0);

        cache.get(ModelKind::Repurchase).await.unwrap();
        let report = HealthReport::collect(&cache);
        assert_eq!(report.cache.count, 1);
        assert_eq!(report.cache.loaded_kinds, vec![ModelKind::Repurchase]);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ServiceStatus::Degraded).unwrap();
        assert_eq!(json, r#""degraded""#);
    }
}
