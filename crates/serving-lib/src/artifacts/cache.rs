//! Process-wide model cache
//!
//! Lazily populates a kind → bundle mapping on first use. Concurrent first
//! accesses to the same kind are serialized so the underlying
//! deserialization runs at most once; a failed load leaves the slot empty so
//! a later request can retry (artifact files may appear after process start,
//! e.g. slow volume mounts). There is no eviction or refresh; cache lifetime
//! equals process lifetime.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{ArtifactBundle, ArtifactSource};
use crate::error::PredictionError;
use crate::models::ModelKind;

type Slot = OnceCell<Arc<ArtifactBundle>>;

pub struct ModelCache {
    source: Arc<dyn ArtifactSource>,
    segmentation: Slot,
    repurchase: Slot,
    route: Slot,
}

impl ModelCache {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self {
            source,
            segmentation: OnceCell::new(),
            repurchase: OnceCell::new(),
            route: OnceCell::new(),
        }
    }

    fn slot(&self, kind: ModelKind) -> &Slot {
        match kind {
            ModelKind::Segmentation => &self.segmentation,
            ModelKind::Repurchase => &self.repurchase,
            ModelKind::RouteRecommendation => &self.route,
        }
    }

    /// Bundle for `kind`, loading it on first use.
    ///
    /// Deserialization is blocking file IO plus graph parsing, so it runs on
    /// the blocking pool while this task awaits.
    pub async fn get(&self, kind: ModelKind) -> Result<Arc<ArtifactBundle>, PredictionError> {
        self.slot(kind)
            .get_or_try_init(|| async move {
                let source = Arc::clone(&self.source);
                let loaded = tokio::task::spawn_blocking(move || source.load(kind))
                    .await
                    .map_err(|e| {
                        PredictionError::Inference(format!("artifact load task failed: {e}"))
                    })?
                    .map_err(|e| {
                        warn!(%kind, error = %e, "Model artifact load failed");
                        e
                    })?;
                info!(%kind, input_len = loaded.estimator().input_len(), "Model artifacts loaded");
                Ok(Arc::new(loaded))
            })
            .await
            .cloned()
    }

    /// Kind → loaded flag, without forcing any load.
    pub fn status(&self) -> Vec<(ModelKind, bool)> {
        ModelKind::ALL
            .iter()
            .map(|&kind| (kind, self.slot(kind).get().is_some()))
            .collect()
    }

    /// Kinds currently resident in the cache.
    pub fn loaded_kinds(&self) -> Vec<ModelKind> {
        self.status()
            .into_iter()
            .filter_map(|(kind, loaded)| loaded.then_some(kind))
            .collect()
    }

    /// Availability check delegated to the source; never loads.
    pub fn probe(&self, kind: ModelKind) -> bool {
        self.source.probe(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::EncoderMap;
    use crate::pipeline::predictor::Estimator;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEstimator;

    impl Estimator for FixedEstimator {
        fn input_len(&self) -> usize {
            1
        }
        fn score(&self, _features: &[f32]) -> Result<Vec<f32>, PredictionError> {
            Ok(vec![0.5])
        }
    }

    fn stub_bundle() -> ArtifactBundle {
        ArtifactBundle::Repurchase {
            estimator: Box::new(FixedEstimator),
            feature_columns: vec!["a".to_string()],
            encoders: EncoderMap::new(),
        }
    }

    /// Counts loads; fails the first `fail_first` calls.
    struct CountingSource {
        loads: AtomicUsize,
        fail_first: usize,
    }

    impl CountingSource {
        fn new(fail_first: usize) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                fail_first,
            }
        }
        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl ArtifactSource for CountingSource {
        fn load(&self, kind: ModelKind) -> Result<ArtifactBundle, PredictionError> {
            // Widen the race window for the concurrency test.
            std::thread::sleep(std::time::Duration::from_millis(10));
            let n = self.loads.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(PredictionError::ArtifactMissing {
                    kind,
                    path: "/nowhere".into(),
                });
            }
            Ok(stub_bundle())
        }

        fn probe(&self, _kind: ModelKind) -> bool {
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_access_loads_exactly_once() {
        let source = Arc::new(CountingSource::new(0));
        let cache = Arc::new(ModelCache::new(source.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.get(ModelKind::Repurchase).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(source.loads(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let source = Arc::new(CountingSource::new(1));
        let cache = ModelCache::new(source.clone());

        let err = cache.get(ModelKind::Segmentation).await.unwrap_err();
        assert_eq!(err.category(), "artifact_missing");
        assert_eq!(cache.loaded_kinds(), Vec::<ModelKind>::new());

        // The retry loads successfully and the result sticks.
        cache.get(ModelKind::Segmentation).await.unwrap();
        cache.get(ModelKind::Segmentation).await.unwrap();
        assert_eq!(source.loads(), 2);
        assert_eq!(cache.loaded_kinds(), vec![ModelKind::Segmentation]);
    }

    #[tokio::test]
    async fn test_status_does_not_force_a_load() {
        let source = Arc::new(CountingSource::new(0));
        let cache = ModelCache::new(source.clone());

        let status = cache.status();
        assert!(status.iter().all(|(_, loaded)| !loaded));
        assert_eq!(source.loads(), 0);

        cache.get(ModelKind::RouteRecommendation).await.unwrap();
        let status = cache.status();
        assert!(status
            .iter()
            .any(|&(kind, loaded)| kind == ModelKind::RouteRecommendation && loaded));
    }

    #[tokio::test]
    async fn test_kinds_cache_independently() {
        let source = Arc::new(CountingSource::new(0));
        let cache = ModelCache::new(source.clone());

        cache.get(ModelKind::Repurchase).await.unwrap();
        cache.get(ModelKind::Repurchase).await.unwrap();
        cache.get(ModelKind::Segmentation).await.unwrap();
        assert_eq!(source.loads(), 2);
    }
}
