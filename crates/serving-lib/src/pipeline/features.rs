//! Per-model-kind feature construction
//!
//! Each builder turns a validated [`RawRecord`] into the exact ordered
//! numeric row its estimator was fit with. Unseen categorical values and
//! malformed timestamps degrade to defined fallback values; they never fail
//! the request.

use serde_json::Value;
use tracing::debug;

use super::temporal;
use crate::artifacts::{CategoricalEncoder, EncoderMap, ScalerParams, FALLBACK_CODE};
use crate::error::PredictionError;
use crate::models::{FeatureVector, RawRecord};

/// Fixed column schema of the segmentation model.
pub const SEGMENTATION_FEATURES: [&str; 13] = [
    "gmv_mean",
    "gmv_total",
    "purchase_count",
    "gmv_std",
    "tickets_mean",
    "tickets_total",
    "tickets_std",
    "round_trip_rate",
    "weekend_rate",
    "preferred_day",
    "avg_hour",
    "preferred_month",
    "avg_company_freq",
];

/// Fixed column schema of the route recommendation model.
pub const ROUTE_FEATURES: [&str; 28] = [
    "fk_contact",
    "date_purchase",
    "time_purchase",
    "place_origin_departure",
    "place_destination_departure",
    "place_origin_return",
    "place_destination_return",
    "fk_departure_ota_bus_company",
    "fk_return_ota_bus_company",
    "gmv_success",
    "total_tickets_quantity_success",
    "day_of_week",
    "month",
    "quarter",
    "is_weekend",
    "hour",
    "period_of_day",
    "route_departure",
    "route_return",
    "is_round_trip",
    "departure_company_freq",
    "return_company_freq",
    "origin_dept_freq",
    "dest_dept_freq",
    "route_departure_freq",
    "cluster",
    "clustering_date",
    "model_version",
];

pub const ROUTE_DEPARTURE_FIELD: &str = "route_departure";

const DATE_FIELD: &str = "date_purchase";
const TIME_FIELD: &str = "time_purchase";

// Synthetic metadata columns the route model was trained with. They carry no
// predictive signal but must be present and encoded like any categorical.
const CLUSTERING_DATE_FIELD: &str = "clustering_date";
const MODEL_VERSION_FIELD: &str = "model_version";
const MODEL_VERSION_TAG: &str = "xgboost-v1";

// Sentinel values written by the upstream pipeline for one-way trips.
const NO_RETURN_PLACE: &str = "0";
const NO_RETURN_CARRIER: &str = "1";
const RETURN_PLACE_FIELDS: [&str; 2] = ["place_origin_return", "place_destination_return"];
const RETURN_CARRIER_FIELD: &str = "fk_return_ota_bus_company";

// Bounded ranges for the hash fallback below.
const SMALL_HASH_BUCKETS: u64 = 10_000;
const LARGE_HASH_BUCKETS: u64 = 100_000;

/// Segmentation: 13 statically named numeric fields in fixed order, rescaled
/// with the bundle's per-feature scaler before distance-based inference.
pub fn build_segmentation(
    record: &RawRecord,
    scaler: &ScalerParams,
) -> Result<FeatureVector, PredictionError> {
    let mut features = Vec::with_capacity(SEGMENTATION_FEATURES.len());
    for name in SEGMENTATION_FEATURES {
        features.push(record.require_f64(name)? as f32);
    }
    scaler.transform(&mut features);
    Ok(features)
}

/// Repurchase: column order comes from the bundle's stored feature list.
/// Categorical columns go through their encoders with the fallback code for
/// unseen values; everything else passes through as numeric; columns absent
/// from the record default to 0 so newly-added optional fields never break
/// older callers.
pub fn build_repurchase(
    record: &RawRecord,
    feature_columns: &[String],
    encoders: &EncoderMap,
) -> FeatureVector {
    feature_columns
        .iter()
        .map(|column| match encoders.get(column.as_str()) {
            Some(encoder) => match record.get(column) {
                Some(value) => encode_categorical(column, value, encoder),
                None => FALLBACK_CODE as f32,
            },
            None => record.get_f64(column).unwrap_or(0.0) as f32,
        })
        .collect()
}

/// Route recommendation: derives temporal features, injects the synthetic
/// metadata columns, applies categorical encoders, and maps residual
/// identifier strings through the bounded hash fallback. Column order is the
/// fixed [`ROUTE_FEATURES`] schema; anything still absent defaults to 0.
pub fn build_route(record: &RawRecord, encoders: &EncoderMap) -> FeatureVector {
    let mut record = record.clone();

    let temporal = temporal::derive_or_default(
        record.get_str(DATE_FIELD).unwrap_or_default(),
        record.get_str(TIME_FIELD).unwrap_or_default(),
    );
    record.insert("day_of_week", Value::from(temporal.day_of_week));
    record.insert("month", Value::from(temporal.month));
    record.insert("quarter", Value::from(temporal.quarter));
    record.insert("is_weekend", Value::from(temporal.is_weekend));
    record.insert("hour", Value::from(temporal.hour));
    record.insert("period_of_day", Value::from(temporal.period_of_day));

    if !record.contains(CLUSTERING_DATE_FIELD) {
        let today = chrono::Utc::now().date_naive().to_string();
        record.insert(CLUSTERING_DATE_FIELD, Value::String(today));
    }
    if !record.contains(MODEL_VERSION_FIELD) {
        record.insert(MODEL_VERSION_FIELD, Value::String(MODEL_VERSION_TAG.to_string()));
    }

    ROUTE_FEATURES
        .iter()
        .map(|&column| route_column_value(&record, column, encoders))
        .collect()
}

fn route_column_value(record: &RawRecord, column: &str, encoders: &EncoderMap) -> f32 {
    let Some(value) = record.get(column) else {
        return 0.0;
    };

    // Encoder-covered columns resolve to a code, fallback 0 for unseen
    // values; the hash path below never applies to them.
    if let Some(encoder) = encoders.get(column) {
        return encode_categorical(column, value, encoder);
    }

    if let Some(number) = value.as_f64() {
        return number as f32;
    }

    let Some(text) = value.as_str() else {
        return 0.0;
    };

    // Sentinels for "no return leg" keep their training-time numeric
    // meaning instead of going through the hash.
    if RETURN_PLACE_FIELDS.contains(&column) && text == NO_RETURN_PLACE {
        return 0.0;
    }
    if column == RETURN_CARRIER_FIELD && text == NO_RETURN_CARRIER {
        return 1.0;
    }

    hashed_identifier(column, text)
}

fn encode_categorical(field: &str, value: &Value, encoder: &CategoricalEncoder) -> f32 {
    let text = scalar_text(value);
    if !encoder.contains(&text) {
        debug!(field, value = %text, "Value outside training vocabulary, using fallback code");
    }
    encoder.encode(&text) as f32
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Deterministic, lossy mapping of an un-encoded identifier string into a
/// bounded numeric range. Collisions are accepted: these fields served as
/// row keys at training time and carry no ordering semantics. FNV-1a keeps
/// the mapping stable across processes and platforms.
fn hashed_identifier(field: &str, text: &str) -> f32 {
    debug!(field, "Un-encoded identifier string, hashing into bounded range");
    (fnv1a64(text) % hash_buckets(field)) as f32
}

fn hash_buckets(field: &str) -> u64 {
    if RETURN_PLACE_FIELDS.contains(&field)
        || field == CLUSTERING_DATE_FIELD
        || field == MODEL_VERSION_FIELD
    {
        SMALL_HASH_BUCKETS
    } else {
        LARGE_HASH_BUCKETS
    }
}

fn fnv1a64(text: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    text.bytes()
        .fold(OFFSET_BASIS, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}
