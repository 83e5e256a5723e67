//! The model-serving request pipeline
//!
//! Per request: resolve the kind's artifact bundle through the cache, build
//! the feature vector, invoke the estimator, shape the response. Request
//! state is request-local; the bundle is shared read-only.

pub mod features;
pub mod predictor;
pub mod shaper;
pub mod temporal;

pub use predictor::Estimator;

use std::sync::Arc;
use std::time::Instant;

use crate::artifacts::{ArtifactBundle, ModelCache};
use crate::error::PredictionError;
use crate::models::{
    ModelKind, RawRecord, RawScores, RepurchaseRequest, RepurchaseResponse, RouteRequest,
    RouteResponse, SegmentationRequest, SegmentationResponse,
};
use crate::observability::ServiceMetrics;

/// One pipeline instance serves all three model kinds for the process
/// lifetime. Cheap to share behind an `Arc`.
pub struct PredictionPipeline {
    cache: Arc<ModelCache>,
    metrics: ServiceMetrics,
}

impl PredictionPipeline {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self {
            cache,
            metrics: ServiceMetrics::new(),
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub async fn predict_segmentation(
        &self,
        request: &SegmentationRequest,
    ) -> Result<SegmentationResponse, PredictionError> {
        let start = Instant::now();
        let result = self.segmentation_inner(request).await;
        self.finish(ModelKind::Segmentation, start, result.as_ref().err());
        result
    }

    pub async fn predict_repurchase(
        &self,
        request: &RepurchaseRequest,
    ) -> Result<RepurchaseResponse, PredictionError> {
        let start = Instant::now();
        let result = self.repurchase_inner(request).await;
        self.finish(ModelKind::Repurchase, start, result.as_ref().err());
        result
    }

    pub async fn predict_routes(
        &self,
        request: &RouteRequest,
    ) -> Result<RouteResponse, PredictionError> {
        let start = Instant::now();
        let result = self.routes_inner(request).await;
        self.finish(ModelKind::RouteRecommendation, start, result.as_ref().err());
        result
    }

    fn finish(&self, kind: ModelKind, start: Instant, error: Option<&PredictionError>) {
        self.metrics
            .observe_prediction(kind, start.elapsed().as_secs_f64());
        if let Some(error) = error {
            self.metrics.inc_prediction_error(kind, error.category());
        }
        self.metrics
            .set_models_loaded(self.cache.loaded_kinds().len() as i64);
    }

    async fn segmentation_inner(
        &self,
        request: &SegmentationRequest,
    ) -> Result<SegmentationResponse, PredictionError> {
        let bundle = self.cache.get(ModelKind::Segmentation).await?;
        let ArtifactBundle::Segmentation { scaler, profiles, .. } = bundle.as_ref() else {
            return Err(wrong_bundle(ModelKind::Segmentation));
        };

        let record = RawRecord::from_serialize(request)?;
        let vector = features::build_segmentation(&record, scaler)?;
        let RawScores::Segmentation { cluster, distances } = predictor::run(&bundle, &vector)?
        else {
            return Err(wrong_scores(ModelKind::Segmentation));
        };
        Ok(shaper::shape_segmentation(cluster, &distances, profiles))
    }

    async fn repurchase_inner(
        &self,
        request: &RepurchaseRequest,
    ) -> Result<RepurchaseResponse, PredictionError> {
        let bundle = self.cache.get(ModelKind::Repurchase).await?;
        let ArtifactBundle::Repurchase { feature_columns, encoders, .. } = bundle.as_ref() else {
            return Err(wrong_bundle(ModelKind::Repurchase));
        };

        let record = RawRecord::from_serialize(request)?;
        let vector = features::build_repurchase(&record, feature_columns, encoders);
        let RawScores::Repurchase { probability } = predictor::run(&bundle, &vector)? else {
            return Err(wrong_scores(ModelKind::Repurchase));
        };
        Ok(shaper::shape_repurchase(probability))
    }

    async fn routes_inner(&self, request: &RouteRequest) -> Result<RouteResponse, PredictionError> {
        let bundle = self.cache.get(ModelKind::RouteRecommendation).await?;
        let ArtifactBundle::RouteRecommendation { labels, encoders, .. } = bundle.as_ref() else {
            return Err(wrong_bundle(ModelKind::RouteRecommendation));
        };

        let record = RawRecord::from_serialize(request)?;
        let vector = features::build_route(&record, encoders);
        let RawScores::RouteRecommendation { distribution } = predictor::run(&bundle, &vector)?
        else {
            return Err(wrong_scores(ModelKind::RouteRecommendation));
        };
        Ok(shaper::shape_route(
            &distribution,
            labels,
            encoders,
            request.cluster,
        ))
    }
}

fn wrong_bundle(kind: ModelKind) -> PredictionError {
    PredictionError::Inference(format!("cache slot for {kind} holds a different bundle kind"))
}

fn wrong_scores(kind: ModelKind) -> PredictionError {
    PredictionError::Inference(format!("estimator for {kind} produced mismatched scores"))
}
