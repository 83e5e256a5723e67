//! Core data models for the prediction service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PredictionError;
use crate::profiles::ClusterProfile;

/// The three prediction tasks served by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Segmentation,
    Repurchase,
    RouteRecommendation,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::Segmentation,
        ModelKind::Repurchase,
        ModelKind::RouteRecommendation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Segmentation => "segmentation",
            ModelKind::Repurchase => "repurchase",
            ModelKind::RouteRecommendation => "route_recommendation",
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered numeric input row for an estimator.
pub type FeatureVector = Vec<f32>;

/// An open field-name → scalar mapping, as supplied by a caller.
///
/// Built from a typed request DTO at the validation boundary; feature
/// builders read it by name so that newly-added optional fields never break
/// older callers. Unknown extra fields are ignored.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    /// Flatten a serializable request into a record.
    pub fn from_serialize<T: Serialize>(input: &T) -> Result<Self, PredictionError> {
        match serde_json::to_value(input) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(_) => Err(PredictionError::Validation(
                "request body must be a JSON object".to_string(),
            )),
            Err(e) => Err(PredictionError::Validation(e.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Numeric field that must be present, or the request is rejected.
    pub fn require_f64(&self, name: &str) -> Result<f64, PredictionError> {
        self.get_f64(name).ok_or_else(|| {
            PredictionError::Validation(format!("missing or non-numeric field: {name}"))
        })
    }

    /// String field that must be present, or the request is rejected.
    pub fn require_str(&self, name: &str) -> Result<&str, PredictionError> {
        self.get_str(name)
            .ok_or_else(|| PredictionError::Validation(format!("missing string field: {name}")))
    }
}

/// Raw estimator output, before response shaping.
#[derive(Debug, Clone)]
pub enum RawScores {
    /// Nearest centroid plus the full per-centroid distance row.
    Segmentation { cluster: usize, distances: Vec<f32> },
    /// Positive-class probability in [0, 1].
    Repurchase { probability: f32 },
    /// Probability distribution over the trained route label space.
    RouteRecommendation { distribution: Vec<f32> },
}

/// Risk band derived from the repurchase probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

/// One entry of the ranked route recommendation output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPrediction {
    pub rank: u32,
    pub route: String,
    pub probability: f32,
    pub confidence: f32,
}

// ---------------------------------------------------------------------------
// Request DTOs. These are the validation boundary: serde rejects missing or
// wrongly-typed required fields before any feature construction runs.
// ---------------------------------------------------------------------------

/// Behavioral segmentation input: 13 numeric aggregates per customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationRequest {
    pub gmv_mean: f64,
    pub gmv_total: f64,
    pub purchase_count: f64,
    pub gmv_std: f64,
    pub tickets_mean: f64,
    pub tickets_total: f64,
    pub tickets_std: f64,
    pub round_trip_rate: f64,
    pub weekend_rate: f64,
    pub preferred_day: f64,
    pub avg_hour: f64,
    pub preferred_month: f64,
    pub avg_company_freq: f64,
}

/// Repurchase-likelihood input: 3 categorical identifiers + 21 numeric
/// aggregates over the customer's purchase history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepurchaseRequest {
    pub last_purchase_gmv: f64,
    pub last_purchase_tickets: f64,
    pub origin: String,
    pub destination: String,
    pub carrier: String,
    pub days_since_last_purchase: f64,
    pub total_purchases: f64,
    pub unique_purchase_days: f64,
    pub gmv_total: f64,
    pub gmv_mean: f64,
    pub gmv_std: f64,
    pub gmv_min: f64,
    pub gmv_max: f64,
    pub tickets_total: f64,
    pub tickets_mean: f64,
    pub tickets_max: f64,
    pub preferred_month: f64,
    pub preferred_weekday: f64,
    pub mean_hour: f64,
    pub hour_std: f64,
    pub unique_origins: f64,
    pub unique_destinations: f64,
    pub unique_carriers: f64,
    pub mean_interval_days: f64,
}

/// Route recommendation input: the current transaction plus precomputed
/// frequency features and the caller's segmentation cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub fk_contact: String,
    /// Purchase date, "YYYY-MM-DD".
    pub date_purchase: String,
    /// Purchase time, "HH:MM:SS".
    pub time_purchase: String,
    pub place_origin_departure: String,
    pub place_destination_departure: String,
    pub place_origin_return: String,
    pub place_destination_return: String,
    pub fk_departure_ota_bus_company: String,
    pub fk_return_ota_bus_company: String,
    pub gmv_success: f64,
    pub total_tickets_quantity_success: f64,
    pub route_departure: String,
    pub route_return: String,
    pub is_round_trip: f64,
    pub departure_company_freq: f64,
    pub return_company_freq: f64,
    pub origin_dept_freq: f64,
    pub dest_dept_freq: f64,
    pub route_departure_freq: f64,
    pub cluster: i64,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationResponse {
    pub cluster: i64,
    pub profile: ClusterProfile,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepurchaseResponse {
    pub will_purchase: bool,
    pub probability: f32,
    pub risk_category: RiskCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub top_routes: Vec<RankedPrediction>,
    pub user_cluster: i64,
}
