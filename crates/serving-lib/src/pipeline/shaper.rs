//! Response shaping
//!
//! Turns raw estimator scores into the stable per-kind response contracts:
//! cluster profile lookup, risk banding, and deterministic top-K ranking.

use crate::artifacts::{EncoderMap, LabelCodec};
use crate::models::{
    RankedPrediction, RepurchaseResponse, RiskCategory, RouteResponse, SegmentationResponse,
};
use crate::pipeline::features::ROUTE_DEPARTURE_FIELD;
use crate::profiles::ClusterProfileTable;

/// Number of ranked routes returned per recommendation.
pub const TOP_K: usize = 3;

/// Probability at or above which a customer is banded High.
const HIGH_RISK_THRESHOLD: f32 = 0.6;
/// Probability at or above which a customer is banded Medium.
const MEDIUM_RISK_THRESHOLD: f32 = 0.3;
/// Decision threshold for the boolean repurchase verdict.
const PURCHASE_THRESHOLD: f32 = 0.5;

/// Profile lookup never fails: ids outside the table get the generic
/// profile. Confidence is 1/(1 + nearest distance), bounded in (0, 1] and
/// display-only.
pub fn shape_segmentation(
    cluster: usize,
    distances: &[f32],
    profiles: &ClusterProfileTable,
) -> SegmentationResponse {
    let nearest = distances.iter().copied().fold(f32::INFINITY, f32::min);
    let confidence = 1.0 / (1.0 + nearest.max(0.0));
    SegmentationResponse {
        cluster: cluster as i64,
        profile: profiles.get(cluster as i64),
        confidence,
    }
}

pub fn shape_repurchase(probability: f32) -> RepurchaseResponse {
    let risk_category = if probability >= HIGH_RISK_THRESHOLD {
        RiskCategory::High
    } else if probability >= MEDIUM_RISK_THRESHOLD {
        RiskCategory::Medium
    } else {
        RiskCategory::Low
    };
    RepurchaseResponse {
        will_purchase: probability > PURCHASE_THRESHOLD,
        probability,
        risk_category,
    }
}

/// Top-K labels by probability descending, ties broken by ascending label
/// index for determinism. The caller-supplied cluster id is echoed back
/// unchanged.
pub fn shape_route(
    distribution: &[f32],
    labels: &LabelCodec,
    encoders: &EncoderMap,
    user_cluster: i64,
) -> RouteResponse {
    let mut ranked: Vec<(usize, f32)> = distribution.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let top_routes = ranked
        .into_iter()
        .take(TOP_K)
        .enumerate()
        .map(|(position, (index, probability))| RankedPrediction {
            rank: position as u32 + 1,
            route: decode_route(index, labels, encoders),
            probability,
            confidence: probability * 100.0,
        })
        .collect();

    RouteResponse {
        top_routes,
        user_cluster,
    }
}

/// Label index → route token. When the route feature encoder exists and the
/// token parses as one of its codes, a second inverse decode recovers the
/// pre-training human-readable token.
fn decode_route(index: usize, labels: &LabelCodec, encoders: &EncoderMap) -> String {
    let token = labels.decode(index).unwrap_or_default();
    if let Some(encoder) = encoders.get(ROUTE_DEPARTURE_FIELD) {
        if let Ok(code) = token.parse::<usize>() {
            if let Some(original) = encoder.decode(code) {
                return original.to_string();
            }
        }
    }
    token.to_string()
}
