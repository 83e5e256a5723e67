//! ONNX estimator loading and invocation using tract
//!
//! Each model kind ships its estimator as an ONNX graph exported by the
//! offline training pipeline with a single score tensor output (distances,
//! class probabilities, or a label distribution). tract keeps inference
//! lightweight and dependency-free at runtime.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

use crate::error::PredictionError;
use crate::pipeline::predictor::Estimator;

/// Inference latency threshold before a warning is logged.
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// tract-backed estimator with a declared input width.
pub struct OnnxEstimator {
    plan: TractModel,
    input_len: usize,
}

impl OnnxEstimator {
    /// Parse and optimize an ONNX graph from raw bytes.
    pub fn from_bytes(model_bytes: &[u8], input_len: usize) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, input_len]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { plan, input_len })
    }

    /// Load an ONNX graph from a file.
    pub fn from_path(path: &Path, input_len: usize) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        Self::from_bytes(&bytes, input_len)
    }
}

impl Estimator for OnnxEstimator {
    fn input_len(&self) -> usize {
        self.input_len
    }

    fn score(&self, features: &[f32]) -> Result<Vec<f32>, PredictionError> {
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.input_len), features.to_vec())
                .map_err(|e| PredictionError::Inference(format!("bad input shape: {e}")))?
                .into();

        let start = Instant::now();
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| PredictionError::Inference(format!("model run failed: {e}")))?;

        // Score tensor convention: the graph's last output. Covers both
        // score-only exports and (label, scores) pairs.
        let output = outputs
            .last()
            .ok_or_else(|| PredictionError::Inference("model produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PredictionError::Inference(format!("non-f32 model output: {e}")))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms target", MAX_INFERENCE_MS
            );
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(view.iter().copied().collect())
    }
}
