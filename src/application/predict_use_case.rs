// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// JSON in, JSON out, on top of a loaded Predictor:
//   - a feature object        → one prediction object
//   - an array of objects     → a list of predictions
//   - explain (object only)   → {feature: importance, ...}
//                               ordered most important first

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::domain::prediction::{Explanation, PredictionResult};
use crate::domain::student::FeatureMap;
use crate::domain::traits::RiskPredictor;
use crate::ml::predictor::Predictor;

/// A prediction request: one feature map or a list of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PredictionRequest {
    Single(FeatureMap),
    Batch(Vec<FeatureMap>),
}

impl PredictionRequest {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .context("Request must be a JSON object of features or an array of such objects")
    }
}

pub struct PredictUseCase<P: RiskPredictor = Predictor> {
    predictor: P,
}

impl PredictUseCase {
    pub fn load(artifacts_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = artifacts_dir.as_ref();
        let predictor = Predictor::load(dir)
            .with_context(|| format!("Cannot load model from '{}'. Have you run 'train' first?", dir.display()))?;
        Ok(Self::with_predictor(predictor))
    }
}

impl<P: RiskPredictor> PredictUseCase<P> {
    pub fn with_predictor(predictor: P) -> Self {
        Self { predictor }
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<Vec<PredictionResult>> {
        let results = match request {
            PredictionRequest::Single(features) => vec![self.predictor.predict_single(features)?],
            PredictionRequest::Batch(batch)     => self.predictor.predict_batch(batch)?,
        };
        Ok(results)
    }

    /// Single request → object, batch → array.
    pub fn predict_json(&self, json: &str) -> Result<String> {
        let request = PredictionRequest::parse(json)?;
        let results = self.predict(&request)?;
        let out = match (&request, results.as_slice()) {
            (PredictionRequest::Single(_), [one]) => serde_json::to_string_pretty(one)?,
            _ => serde_json::to_string_pretty(&results)?,
        };
        Ok(out)
    }

    pub fn explain(&self, request: &PredictionRequest) -> Result<Explanation> {
        match request {
            PredictionRequest::Single(features) => Ok(self.predictor.explain(features)?),
            PredictionRequest::Batch(_) => bail!("explain takes a single feature object, not an array"),
        }
    }

    pub fn explain_json(&self, json: &str) -> Result<String> {
        let explanation = self.explain(&PredictionRequest::parse(json)?)?;
        Ok(serde_json::to_string_pretty(&explanation)?)
    }
}
