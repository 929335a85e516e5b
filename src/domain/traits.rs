// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams the outer layers program against:
//   - TableSource  → anything that yields a raw training table
//                    (CSV file, synthetic generator)
//   - RiskPredictor → the only surface the request layer talks to
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::error::PredictionError;
use crate::domain::prediction::{Explanation, PredictionResult};
use crate::domain::student::{FeatureMap, RawTable};

// ─── TableSource ──────────────────────────────────────────────────────────────
/// Any component that can produce a raw student table.
///
/// Implementations:
///   - CsvLoader          → reads a CSV export
///   - SyntheticGenerator → rule-labelled synthetic students
pub trait TableSource {
    fn load_table(&self) -> Result<RawTable>;
}

// ─── RiskPredictor ────────────────────────────────────────────────────────────
/// Dropout-risk prediction and explanation over raw feature maps.
///
/// Implementations must be usable from several callers at once
/// for read-only inference.
pub trait RiskPredictor {
    fn predict_single(&self, features: &FeatureMap) -> Result<PredictionResult, PredictionError>;

    /// Independent `predict_single` calls; no state crosses samples.
    fn predict_batch(&self, batch: &[FeatureMap]) -> Result<Vec<PredictionResult>, PredictionError> {
        batch
            .iter()
            .enumerate()
            .map(|(index, features)| {
                self.predict_single(features).map_err(|e| PredictionError::BatchItem {
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }

    fn explain(&self, features: &FeatureMap) -> Result<Explanation, PredictionError>;
}
