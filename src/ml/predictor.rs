// ============================================================
// Layer 5 — Predictor
// ============================================================
// Owns one fitted preprocessing pipeline and one trained model,
// both loaded from the same artifacts directory at construction.
// Construction fails with an InitializationError if either is
// missing, corrupt, or their widths disagree. A constructed
// Predictor is read-only: every call runs the model in inference
// mode, so running statistics are never touched.
//
//   predict_single: transform → forward → softmax → label/score
//   predict_batch:  independent predict_single calls
//   explain:        mean of the per-step masks, one weight per
//                   feature, sorted descending

use std::path::Path;
use burn::{prelude::*, tensor::activation::softmax};

use crate::data::preprocessor::PreprocessingPipeline;
use crate::domain::error::{InitializationError, PredictionError, PreprocessingError};
use crate::domain::prediction::{Explanation, PredictionResult, RiskLevel};
use crate::domain::student::FeatureMap;
use crate::domain::traits::RiskPredictor;
use crate::infra::artifact_store::ArtifactStore;
use crate::ml::model::{ClassifierOutput, TabNetClassifier};
use crate::ml::InferBackend;

pub struct Predictor<B: Backend = InferBackend> {
    pipeline: PreprocessingPipeline,
    model:    TabNetClassifier<B>,
    device:   B::Device,
}

impl<B: Backend> Predictor<B> {
    /// Load `preprocessor.json` and the committed checkpoint from `artifacts_dir`.
    pub fn load(artifacts_dir: impl AsRef<Path>) -> Result<Self, InitializationError> {
        Self::load_on(artifacts_dir, Default::default())
    }

    pub fn load_on(artifacts_dir: impl AsRef<Path>, device: B::Device) -> Result<Self, InitializationError> {
        let store = ArtifactStore::new(artifacts_dir.as_ref());
        let pipeline = store.load_preprocessor()?;

        let checkpoints = store.checkpoints();
        let meta = checkpoints.load_meta()?;
        if meta.model.input_dim != pipeline.width() {
            return Err(InitializationError::DimensionMismatch {
                expected: meta.model.input_dim,
                actual:   pipeline.width(),
            });
        }
        let model = checkpoints.load_model::<B>(&meta.model, &device)?;
        tracing::info!(
            "Predictor ready: {} features, checkpoint from epoch {}",
            pipeline.width(),
            meta.epoch
        );
        Self::from_parts(pipeline, model, device)
    }

    /// Pair an in-memory pipeline and model, checking they agree on width.
    pub fn from_parts(
        pipeline: PreprocessingPipeline,
        model:    TabNetClassifier<B>,
        device:   B::Device,
    ) -> Result<Self, InitializationError> {
        if model.input_dim != pipeline.width() {
            return Err(InitializationError::DimensionMismatch {
                expected: model.input_dim,
                actual:   pipeline.width(),
            });
        }
        Ok(Self { pipeline, model, device })
    }

    pub fn feature_names(&self) -> &[String] {
        self.pipeline.feature_names()
    }

    fn forward_one(&self, features: &FeatureMap) -> Result<ClassifierOutput<B>, PredictionError> {
        let vector = self.pipeline.transform_one(features)?;
        if vector.len() != self.model.input_dim {
            return Err(PreprocessingError::WidthMismatch {
                expected: self.model.input_dim,
                actual:   vector.len(),
            }
            .into());
        }
        let x = Tensor::<B, 1>::from_floats(vector.as_slice(), &self.device).unsqueeze::<2>();
        Ok(self.model.forward(x, false))
    }
}

fn row_values<B: Backend>(t: Tensor<B, 2>) -> Result<Vec<f32>, PredictionError> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| PredictionError::Backend(format!("{e:?}")))
}

impl<B: Backend> RiskPredictor for Predictor<B> {
    fn predict_single(&self, features: &FeatureMap) -> Result<PredictionResult, PredictionError> {
        let output = self.forward_one(features)?;
        let probs = row_values(softmax(output.logits, 1))?;
        let p_high = probs
            .get(RiskLevel::High.class_index())
            .copied()
            .ok_or_else(|| PredictionError::Backend("model produced fewer than two class scores".into()))?;
        if !p_high.is_finite() {
            return Err(PredictionError::Backend(format!("model produced a non-finite probability {p_high}")));
        }

        let result = PredictionResult::from_high_probability(p_high, features);
        tracing::debug!(
            "Prediction: {:?} (risk_score={:.4}, confidence={:.4})",
            result.dropout_risk,
            result.risk_score,
            result.confidence
        );
        Ok(result)
    }

    fn explain(&self, features: &FeatureMap) -> Result<Explanation, PredictionError> {
        let output = self.forward_one(features)?;
        let steps = output.masks.len().max(1);
        let mean = Tensor::cat(output.masks, 0)
            .sum_dim(0)
            .div_scalar(steps as f64);
        let weights = row_values(mean)?;
        Ok(Explanation::from_weights(self.feature_names(), &weights)?)
    }
}
