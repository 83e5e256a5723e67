//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serving_lib::{
    artifacts::{CategoricalEncoder, EncoderMap, LabelCodec, ScalerParams},
    pipeline::features::{ROUTE_FEATURES, SEGMENTATION_FEATURES},
    pipeline::Estimator,
    ArtifactBundle, ArtifactSource, HealthReport, ModelCache, ModelKind, PredictionError,
    PredictionPipeline, RepurchaseRequest, RouteRequest, SegmentationRequest, ServiceStatus,
};
use serving_lib::profiles::ClusterProfileTable;
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<PredictionPipeline>,
}

fn error_response(error: PredictionError) -> axum::response::Response {
    let status = match &error {
        PredictionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::ArtifactMissing { .. } | PredictionError::ArtifactCorrupt { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PredictionError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({
            "kind": error.category(),
            "message": error.to_string(),
        })),
    )
        .into_response()
}

async fn predict_segmentation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SegmentationRequest>,
) -> impl IntoResponse {
    match state.pipeline.predict_segmentation(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error),
    }
}

async fn predict_repurchase(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RepurchaseRequest>,
) -> impl IntoResponse {
    match state.pipeline.predict_repurchase(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error),
    }
}

async fn predict_routes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> impl IntoResponse {
    match state.pipeline.predict_routes(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error),
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = HealthReport::collect(state.pipeline.cache());
    let status_code = match report.status {
        ServiceStatus::Healthy | ServiceStatus::Degraded => StatusCode::OK,
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(report))
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/predict/segmentation", post(predict_segmentation))
        .route("/v1/predict/repurchase", post(predict_repurchase))
        .route("/v1/predict/routes", post(predict_routes))
        .route("/healthz", get(healthz))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Stub artifacts
// ---------------------------------------------------------------------------

struct FixedEstimator {
    input_len: usize,
    output: Vec<f32>,
}

impl Estimator for FixedEstimator {
    fn input_len(&self) -> usize {
        self.input_len
    }
    fn score(&self, _features: &[f32]) -> Result<Vec<f32>, PredictionError> {
        Ok(self.output.clone())
    }
}

/// Source serving fixed-output bundles for the listed kinds and
/// ArtifactMissing for the rest.
struct StubSource {
    available: Vec<ModelKind>,
}

impl StubSource {
    fn all() -> Self {
        Self {
            available: ModelKind::ALL.to_vec(),
        }
    }
}

impl ArtifactSource for StubSource {
    fn load(&self, kind: ModelKind) -> Result<ArtifactBundle, PredictionError> {
        if !self.available.contains(&kind) {
            return Err(PredictionError::ArtifactMissing {
                kind,
                path: "/artifacts/missing".into(),
            });
        }
        Ok(match kind {
            ModelKind::Segmentation => ArtifactBundle::Segmentation {
                estimator: Box::new(FixedEstimator {
                    input_len: SEGMENTATION_FEATURES.len(),
                    output: vec![4.2, 0.8, 2.6, 7.9, 3.3],
                }),
                scaler: ScalerParams::new(vec![0.0; 13], vec![1.0; 13]),
                profiles: ClusterProfileTable::default(),
            },
            ModelKind::Repurchase => {
                let feature_columns: Vec<String> = [
                    "origin",
                    "destination",
                    "carrier",
                    "gmv_total",
                    "days_since_last_purchase",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect();
                let mut encoders = EncoderMap::new();
                for field in ["origin", "destination", "carrier"] {
                    encoders.insert(
                        field.to_string(),
                        CategoricalEncoder::new(vec!["trained-a".into(), "trained-b".into()]),
                    );
                }
                ArtifactBundle::Repurchase {
                    estimator: Box::new(FixedEstimator {
                        input_len: feature_columns.len(),
                        output: vec![0.28, 0.72],
                    }),
                    feature_columns,
                    encoders,
                }
            }
            ModelKind::RouteRecommendation => ArtifactBundle::RouteRecommendation {
                estimator: Box::new(FixedEstimator {
                    input_len: ROUTE_FEATURES.len(),
                    output: vec![0.05, 0.55, 0.25, 0.15],
                }),
                labels: LabelCodec::new(vec![
                    "r0".into(),
                    "r1".into(),
                    "r2".into(),
                    "r3".into(),
                ]),
                encoders: EncoderMap::new(),
            },
        })
    }

    fn probe(&self, kind: ModelKind) -> bool {
        self.available.contains(&kind)
    }
}

fn setup_app(source: StubSource) -> Router {
    let cache = Arc::new(ModelCache::new(Arc::new(source)));
    let pipeline = Arc::new(PredictionPipeline::new(cache));
    create_test_router(Arc::new(AppState { pipeline }))
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn segmentation_body() -> serde_json::Value {
    serde_json::json!({
        "gmv_mean": 150.50, "gmv_total": 300.75, "purchase_count": 3,
        "gmv_std": 25.30, "tickets_mean": 1.2, "tickets_total": 4,
        "tickets_std": 0.5, "round_trip_rate": 1.0, "weekend_rate": 0.1,
        "preferred_day": 2, "avg_hour": 14.5, "preferred_month": 6,
        "avg_company_freq": 100.0
    })
}

fn repurchase_body(origin: &str) -> serde_json::Value {
    serde_json::json!({
        "last_purchase_gmv": 120.50, "last_purchase_tickets": 1,
        "origin": origin, "destination": "trained-b", "carrier": "trained-a",
        "days_since_last_purchase": 15, "total_purchases": 5,
        "unique_purchase_days": 4, "gmv_total": 600.25, "gmv_mean": 120.05,
        "gmv_std": 25.30, "gmv_min": 85.0, "gmv_max": 150.75,
        "tickets_total": 6, "tickets_mean": 1.2, "tickets_max": 2,
        "preferred_month": 7, "preferred_weekday": 1, "mean_hour": 14.5,
        "hour_std": 2.1, "unique_origins": 2, "unique_destinations": 3,
        "unique_carriers": 2, "mean_interval_days": 30.5
    })
}

fn routes_body() -> serde_json::Value {
    serde_json::json!({
        "fk_contact": "contact_hash_123",
        "date_purchase": "2024-01-15",
        "time_purchase": "14:30:00",
        "place_origin_departure": "origin_hash_456",
        "place_destination_departure": "dest_hash_789",
        "place_origin_return": "0",
        "place_destination_return": "0",
        "fk_departure_ota_bus_company": "company_hash_abc",
        "fk_return_ota_bus_company": "1",
        "gmv_success": 125.50,
        "total_tickets_quantity_success": 1,
        "route_departure": "route_hash_def",
        "route_return": "0_to_0",
        "is_round_trip": 1,
        "departure_company_freq": 1500,
        "return_company_freq": 1000000,
        "origin_dept_freq": 5000,
        "dest_dept_freq": 3000,
        "route_departure_freq": 250,
        "cluster": 2
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_segmentation_end_to_end() {
    let app = setup_app(StubSource::all());
    let response = app
        .oneshot(post_json("/v1/predict/segmentation", segmentation_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    // Nearest stub centroid is index 1, present in the built-in table.
    assert_eq!(body["cluster"], 1);
    assert!(body["profile"]["description"].is_string());
    assert_ne!(body["profile"]["description"], "Unknown cluster");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!(confidence > 0.0 && confidence <= 1.0);
}

#[tokio::test]
async fn test_repurchase_response_contract() {
    let app = setup_app(StubSource::all());
    let response = app
        .oneshot(post_json("/v1/predict/repurchase", repurchase_body("trained-a")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["will_purchase"], true);
    assert_eq!(body["risk_category"], "High");
    assert!((body["probability"].as_f64().unwrap() - 0.72).abs() < 1e-6);
}

#[tokio::test]
async fn test_unseen_categorical_value_still_succeeds() {
    let app = setup_app(StubSource::all());
    let response = app
        .oneshot(post_json(
            "/v1/predict/repurchase",
            repurchase_body("never-seen-before-origin"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_routes_ranked_output() {
    let app = setup_app(StubSource::all());
    let response = app
        .oneshot(post_json("/v1/predict/routes", routes_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["user_cluster"], 2);
    let top_routes = body["top_routes"].as_array().unwrap();
    assert_eq!(top_routes.len(), 3);
    assert_eq!(top_routes[0]["rank"], 1);
    assert_eq!(top_routes[0]["route"], "r1");
    let probabilities: Vec<f64> = top_routes
        .iter()
        .map(|r| r["probability"].as_f64().unwrap())
        .collect();
    assert!(probabilities.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_malformed_timestamp_still_succeeds() {
    let app = setup_app(StubSource::all());
    let mut body = routes_body();
    body["date_purchase"] = serde_json::json!("not-a-date");
    body["time_purchase"] = serde_json::json!("99:99:99");

    let response = app
        .oneshot(post_json("/v1/predict/routes", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_artifacts_return_503() {
    let app = setup_app(StubSource { available: vec![] });
    let response = app
        .oneshot(post_json("/v1/predict/segmentation", segmentation_body()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["kind"], "artifact_missing");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_missing_required_field_is_rejected() {
    let app = setup_app(StubSource::all());
    let mut body = segmentation_body();
    body.as_object_mut().unwrap().remove("gmv_mean");

    let response = app
        .oneshot(post_json("/v1/predict/segmentation", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_healthz_healthy_when_all_kinds_resolvable() {
    let app = setup_app(StubSource::all());
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models"]["segmentation"], true);
    assert_eq!(body["cache"]["count"], 0);
}

#[tokio::test]
async fn test_healthz_degraded_when_some_kinds_missing() {
    let app = setup_app(StubSource {
        available: vec![ModelKind::Segmentation],
    });
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Degraded still returns 200 (operational)
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["models"]["repurchase"], false);
}

#[tokio::test]
async fn test_healthz_unhealthy_when_nothing_resolvable() {
    let app = setup_app(StubSource { available: vec![] });
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
}

#[tokio::test]
async fn test_healthz_reports_cache_contents_after_a_prediction() {
    let cache = Arc::new(ModelCache::new(Arc::new(StubSource::all())));
    let pipeline = Arc::new(PredictionPipeline::new(cache));
    let app = create_test_router(Arc::new(AppState {
        pipeline: pipeline.clone(),
    }));

    app.clone()
        .oneshot(post_json("/v1/predict/segmentation", segmentation_body()))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["cache"]["count"], 1);
    assert_eq!(body["cache"]["loaded_kinds"][0], "segmentation");
}
