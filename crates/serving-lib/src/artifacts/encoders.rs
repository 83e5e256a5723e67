//! Categorical encoders and the feature scaler
//!
//! These are the non-estimator artifacts of a bundle: fixed string→integer
//! vocabularies learned at training time, the label-space codec for the
//! route model, and the per-feature linear scaler for segmentation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Code substituted for any categorical value unseen at training time.
pub const FALLBACK_CODE: i64 = 0;

/// A training-time string→integer vocabulary. The code of a value is its
/// index in the sorted class list the encoder was fit with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct CategoricalEncoder {
    classes: Vec<String>,
    index: HashMap<String, i64>,
}

impl CategoricalEncoder {
    pub fn new(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as i64))
            .collect();
        Self { classes, index }
    }

    /// Total encoding function: values outside the vocabulary resolve to
    /// [`FALLBACK_CODE`], never an error.
    pub fn encode(&self, value: &str) -> i64 {
        self.index.get(value).copied().unwrap_or(FALLBACK_CODE)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    /// Inverse lookup of a code back to its training-time value.
    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl From<Vec<String>> for CategoricalEncoder {
    fn from(classes: Vec<String>) -> Self {
        Self::new(classes)
    }
}

impl From<CategoricalEncoder> for Vec<String> {
    fn from(encoder: CategoricalEncoder) -> Self {
        encoder.classes
    }
}

/// Map of categorical field name → encoder, as stored in an encoder sidecar
/// file (`{"field": ["class0", "class1", ...], ...}`).
pub type EncoderMap = HashMap<String, CategoricalEncoder>;

/// Label-space codec for the route model: label index ↔ route token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelCodec {
    classes: Vec<String>,
}

impl LabelCodec {
    pub fn new(classes: Vec<String>) -> Self {
        Self { classes }
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Per-feature linear rescale parameters fit at training time.
///
/// Applied as `(x - center) / scale` before distance-based inference. Scale
/// entries of zero are treated as one, matching the fitting library's
/// handling of constant features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerParams {
    center: Vec<f32>,
    scale: Vec<f32>,
}

impl ScalerParams {
    pub fn new(center: Vec<f32>, scale: Vec<f32>) -> Self {
        Self { center, scale }
    }

    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }

    /// True when center and scale agree with each other and with `width`.
    pub fn matches_width(&self, width: usize) -> bool {
        self.center.len() == width && self.scale.len() == width
    }

    pub fn transform(&self, features: &mut [f32]) {
        for (i, value) in features.iter_mut().enumerate() {
            let center = self.center.get(i).copied().unwrap_or(0.0);
            let scale = match self.scale.get(i).copied() {
                Some(s) if s != 0.0 => s,
                _ => 1.0,
            };
            *value = (*value - center) / scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> CategoricalEncoder {
        CategoricalEncoder::new(vec![
            "alpha".to_string(),
            "beta".to_string(),
            "gamma".to_string(),
        ])
    }

    #[test]
    fn test_known_values_encode_to_their_index() {
        let enc = encoder();
        assert_eq!(enc.encode("alpha"), 0);
        assert_eq!(enc.encode("beta"), 1);
        assert_eq!(enc.encode("gamma"), 2);
    }

    #[test]
    fn test_unseen_value_encodes_to_fallback_code() {
        let enc = encoder();
        assert_eq!(enc.encode("never-seen"), FALLBACK_CODE);
        assert!(!enc.contains("never-seen"));
    }

    #[test]
    fn test_decode_is_inverse_of_encode() {
        let enc = encoder();
        assert_eq!(enc.decode(1), Some("beta"));
        assert_eq!(enc.decode(99), None);
    }

    #[test]
    fn test_encoder_map_deserializes_from_sidecar_shape() {
        let json = r#"{"origin": ["a", "b"], "carrier": ["x"]}"#;
        let map: EncoderMap = serde_json::from_str(json).unwrap();
        assert_eq!(map["origin"].encode("b"), 1);
        assert_eq!(map["carrier"].encode("unknown"), FALLBACK_CODE);
    }

    #[test]
    fn test_scaler_applies_center_and_scale() {
        let scaler = ScalerParams::new(vec![1.0, 2.0], vec![2.0, 4.0]);
        let mut features = vec![3.0, 10.0];
        scaler.transform(&mut features);
        assert_eq!(features, vec![1.0, 2.0]);
    }

    #[test]
    fn test_scaler_zero_scale_is_identity_denominator() {
        let scaler = ScalerParams::new(vec![1.0], vec![0.0]);
        let mut features = vec![5.0];
        scaler.transform(&mut features);
        assert_eq!(features, vec![4.0]);
    }
}
