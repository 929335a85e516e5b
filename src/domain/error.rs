// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed failures for each stage:
//   PreprocessingError   — fitting the pipeline or transforming a sample
//   InitializationError  — loading artifacts; the predictor is unusable
//   PredictionError      — one request failed; others are unaffected
//   TrainingError        — the training loop cannot continue
//
// Application and CLI code wraps these in anyhow with context.

use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A single request was malformed. Recoverable; other requests are unaffected.
    InvalidInput,
    /// The training data itself is unusable.
    InvalidData,
}

/// Failures while fitting the pipeline or transforming a sample.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    #[error("missing required feature '{feature}'")]
    MissingFeature { feature: String },

    #[error("unseen category '{value}' for feature '{feature}'")]
    UnseenCategory { feature: String, value: String },

    #[error("feature '{feature}' expects a number, got '{value}'")]
    NotNumeric { feature: String, value: String },

    #[error("column '{0}' not present in the table")]
    MissingColumn(String),

    #[error("cannot fit on an empty table")]
    EmptyTable,

    #[error("invalid label '{value}' in row {row}")]
    InvalidLabel { row: usize, value: String },

    #[error("column '{0}' has no values to fit on")]
    EmptyColumn(String),

    #[error("feature vector width mismatch: expected {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },
}

impl PreprocessingError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingFeature { .. }
            | Self::UnseenCategory { .. }
            | Self::NotNumeric { .. }
            | Self::WidthMismatch { .. } => ErrorCategory::InvalidInput,
            Self::MissingColumn(_)
            | Self::EmptyTable
            | Self::InvalidLabel { .. }
            | Self::EmptyColumn(_) => ErrorCategory::InvalidData,
        }
    }

    pub fn missing_feature(feature: impl Into<String>) -> Self {
        Self::MissingFeature { feature: feature.into() }
    }

    pub fn unseen_category(feature: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UnseenCategory { feature: feature.into(), value: value.into() }
    }
}

/// Fatal to the component being constructed: the predictor is unusable.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("artifact not found at '{}'", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("artifact at '{}' is corrupt: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },

    #[error("checkpoint expects {expected} input features but the preprocessing artifact declares {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),
}

impl InitializationError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::CorruptArtifact { path: path.into(), reason: reason.to_string() }
    }
}

/// Per-request prediction failures.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] PreprocessingError),

    #[error("request {index} in batch failed: {source}")]
    BatchItem {
        index:  usize,
        #[source]
        source: Box<PredictionError>,
    },

    #[error("tensor backend error: {0}")]
    Backend(String),
}

impl PredictionError {
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::InvalidInput(e)        => Some(e.category()),
            Self::BatchItem { source, .. } => source.category(),
            Self::Backend(_)             => None,
        }
    }
}

/// Failures that stop the training loop.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("{0} dataset is empty")]
    EmptyDataset(&'static str),

    #[error("training diverged in epoch {epoch}: {non_finite} of {batches} batches produced a non-finite loss")]
    Diverged { epoch: usize, non_finite: usize, batches: usize },

    #[error("no checkpoint was written during training")]
    NoCheckpoint,
}
