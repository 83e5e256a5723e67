//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serving_lib::{
    HealthReport, PredictionError, PredictionPipeline, RepurchaseRequest, RouteRequest,
    SegmentationRequest, ServiceStatus,
};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<PredictionPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<PredictionPipeline>) -> Self {
        Self { pipeline }
    }
}

/// Uniform wire shape for failed predictions
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

fn error_response(error: PredictionError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &error {
        PredictionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictionError::ArtifactMissing { .. } | PredictionError::ArtifactCorrupt { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PredictionError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            kind: error.category(),
            message: error.to_string(),
        }),
    )
}

async fn predict_segmentation(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SegmentationRequest>,
) -> impl IntoResponse {
    match state.pipeline.predict_segmentation(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error).into_response(),
    }
}

async fn predict_repurchase(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RepurchaseRequest>,
) -> impl IntoResponse {
    match state.pipeline.predict_repurchase(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error).into_response(),
    }
}

async fn predict_routes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> impl IntoResponse {
    match state.pipeline.predict_routes(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(error) => error_response(error).into_response(),
    }
}

/// Health check response - 200 while at least one model is servable,
/// 503 once none are
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = HealthReport::collect(state.pipeline.cache());

    let status_code = match report.status {
        ServiceStatus::Healthy => StatusCode::OK,
        ServiceStatus::Degraded => StatusCode::OK, // Still operational
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(report))
}

/// Readiness check response - 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = HealthReport::collect(state.pipeline.cache());

    let status_code = if report.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(serde_json::json!({ "ready": report.status.is_operational() })))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Service discovery endpoint
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "prediction-api",
        "version": env!("CARGO_PKG_VERSION"),
        "operations": [
            "POST /v1/predict/segmentation",
            "POST /v1/predict/repurchase",
            "POST /v1/predict/routes",
            "GET /healthz",
        ],
    }))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/v1/predict/segmentation", post(predict_segmentation))
        .route("/v1/predict/repurchase", post(predict_repurchase))
        .route("/v1/predict/routes", post(predict_routes))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
