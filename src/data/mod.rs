// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a raw student table to tensor batches.
//
//   CSV file / SyntheticGenerator
//       │
//       ▼
//   RawTable              → columns + FeatureValue cells
//       │
//       ▼
//   PreprocessingPipeline → impute, label-encode, stratified
//       │                   split, standard-scale
//       ▼
//   StudentDataset        → implements Burn's Dataset trait
//       │
//       ▼
//   StudentBatcher        → stacks samples into tensor batches
//       │
//       ▼
//   DataLoader            → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads and writes student tables as CSV
pub mod loader;

/// Rule-labelled synthetic students
pub mod synthetic;

/// Encoders, scaler, imputation and the fitted artifact
pub mod preprocessor;

/// Stratified train/test split
pub mod splitter;

/// Implements Burn's Dataset trait for student samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
