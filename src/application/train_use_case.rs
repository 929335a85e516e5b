// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load the raw student table     (Layer 4 - data)
//   Step 2: Fit preprocessing + split      (Layer 4 - data)
//   Step 3: Retire the old checkpoint, then
//           save preprocessing artifact    (Layer 6 - infra)
//   Step 4: Save run config                (Layer 6 - infra)
//   Step 5: Build datasets                 (Layer 4 - data)
//   Step 6: Run training loop              (Layer 5 - ml)
//   Step 7: Evaluate best model on test    (Layer 5 - ml)
//   Step 8: Write metrics.json             (Layer 6 - infra)
//
// The artifact and the checkpoint in one directory always come
// from the same run. A fresh run removes the old checkpoint before
// the new artifact lands; a resumed run reuses the saved artifact
// and only re-splits the table with it.
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    dataset::StudentDataset,
    loader::CsvLoader,
    preprocessor::{PipelineConfig, PreprocessingPipeline},
};
use crate::domain::student::{DEFAULT_CATEGORICAL_COLUMNS, DEFAULT_TARGET_COLUMN};
use crate::domain::traits::TableSource;
use crate::infra::{
    artifact_store::ArtifactStore,
    metrics::{EvaluationReport, MetricsLogger},
};
use crate::ml::{
    default_device,
    model::TabNetConfig,
    trainer::{evaluate, run_training},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs for a training run. Serialisable so it is saved next
// to the checkpoint and a run can be traced back to its settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:           String,
    pub artifacts_dir:       String,
    pub target_column:       String,
    pub categorical_columns: Vec<String>,
    pub test_fraction:       f64,
    pub seed:                u64,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub patience:            usize,
    pub lr:                  f64,
    pub lambda_sparse:       f64,
    /// Non-finite batch losses tolerated per epoch before giving up
    pub non_finite_tolerance: usize,
    pub resume:              bool,
    pub n_steps:             usize,
    pub n_d:                 usize,
    pub n_a:                 usize,
    pub n_shared:            usize,
    pub n_independent:       usize,
    pub virtual_batch_size:  usize,
    pub momentum:            f64,
    pub gamma:               f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:           "data/students.csv".to_string(),
            artifacts_dir:       "artifacts".to_string(),
            target_column:       DEFAULT_TARGET_COLUMN.to_string(),
            categorical_columns: DEFAULT_CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            test_fraction:       0.2,
            seed:                42,
            batch_size:          64,
            epochs:              50,
            patience:            10,
            lr:                  1e-3,
            lambda_sparse:       1e-3,
            non_finite_tolerance: 1,
            resume:              false,
            n_steps:             3,
            n_d:                 8,
            n_a:                 8,
            n_shared:            2,
            n_independent:       2,
            virtual_batch_size:  128,
            momentum:            0.01,
            gamma:               1.5,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.epochs == 0 {
            bail!("epochs must be at least 1");
        }
        if self.patience == 0 {
            bail!("patience must be at least 1");
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            bail!("test_fraction must lie strictly between 0 and 1, got {}", self.test_fraction);
        }
        if !(self.lr.is_finite() && self.lr >= 0.0) {
            bail!("learning rate must be a finite non-negative number, got {}", self.lr);
        }
        if !(self.lambda_sparse.is_finite() && self.lambda_sparse >= 0.0) {
            bail!("lambda_sparse must be a finite non-negative number, got {}", self.lambda_sparse);
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            target_column:       self.target_column.clone(),
            categorical_columns: self.categorical_columns.clone(),
            test_fraction:       self.test_fraction,
            seed:                self.seed,
        }
    }

    pub fn model_config(&self, input_dim: usize) -> TabNetConfig {
        TabNetConfig::new(input_dim)
            .with_n_steps(self.n_steps)
            .with_n_d(self.n_d)
            .with_n_a(self.n_a)
            .with_n_shared(self.n_shared)
            .with_n_independent(self.n_independent)
            .with_virtual_batch_size(self.virtual_batch_size)
            .with_momentum(self.momentum)
            .with_gamma(self.gamma)
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainReport {
    pub best_epoch:        usize,
    pub best_val_loss:     f64,
    pub epochs_run:        usize,
    pub stopped_early:     bool,
    pub evaluation:        EvaluationReport,
    /// Accuracy of always predicting the test split's most common label
    pub majority_baseline: f64,
    pub artifacts_dir:     PathBuf,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on the CSV at `data_path`.
    pub fn execute(&self) -> Result<TrainReport> {
        let loader = CsvLoader::new(&self.config.data_path);
        self.execute_with(&loader)
    }

    /// Execute the full training pipeline end to end on any table source.
    pub fn execute_with(&self, source: &dyn TableSource) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate().context("Invalid training configuration")?;

        // ── Step 1: Load the raw table ────────────────────────────────────────
        let table = source.load_table()?;
        tracing::info!("Loaded {} students with {} columns", table.len(), table.columns.len());

        let store = ArtifactStore::new(&cfg.artifacts_dir);
        let ckpt_manager = store.checkpoints();

        let (pipeline, split) = if cfg.resume && ckpt_manager.exists() {
            // ── Steps 2-3 (resume): reuse the artifact the checkpoint was trained with
            let pipeline = store
                .load_preprocessor()
                .context("Cannot resume: the checkpoint's preprocessing artifact is unusable")?;
            let split = pipeline
                .split_table(&table, cfg.test_fraction, cfg.seed)
                .context("Cannot apply the saved preprocessing artifact to this table")?;
            tracing::info!("Resuming with the saved preprocessing artifact ({} features)", pipeline.width());
            (pipeline, split)
        } else {
            // ── Step 2: Fit preprocessing, stratified split ───────────────────
            let (pipeline, split) = PreprocessingPipeline::fit(&table, &cfg.pipeline_config())
                .context("Cannot fit preprocessing pipeline")?;

            // ── Step 3: Retire the old checkpoint, save the new artifact ──────
            ckpt_manager.clear()?;
            store.save_preprocessor(&pipeline)?;
            (pipeline, split)
        };

        // ── Step 4: Save run config next to the checkpoint ────────────────────
        ckpt_manager.save_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.artifacts_dir, cfg.resume)?;

        // ── Step 5: Build Burn datasets ───────────────────────────────────────
        let test_vectors = split.test_vectors.clone();
        let test_labels  = split.test_labels.clone();
        let train_dataset = StudentDataset::from_parts(split.train_vectors, split.train_labels);
        let val_dataset   = StudentDataset::from_parts(split.test_vectors, split.test_labels);
        let majority_baseline = val_dataset.majority_fraction();
        tracing::info!(
            "Split: {} train, {} validation (majority baseline {:.1}%)",
            train_dataset.sample_count(),
            val_dataset.sample_count(),
            majority_baseline * 100.0
        );

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let outcome = run_training(
            cfg,
            cfg.model_config(pipeline.width()),
            train_dataset,
            val_dataset,
            &ckpt_manager,
            &metrics,
        )?;

        // ── Step 7: Evaluate the reloaded best model ──────────────────────────
        let evaluation = evaluate(
            &outcome.model,
            StudentDataset::from_parts(test_vectors, test_labels),
            cfg.batch_size,
            &default_device(),
        )?;
        tracing::info!(
            "Test accuracy {:.1}% | precision {:.3} | recall {:.3} | F1 {:.3}",
            evaluation.accuracy * 100.0,
            evaluation.precision,
            evaluation.recall,
            evaluation.f1
        );

        // ── Step 8: Persist the report ────────────────────────────────────────
        metrics.write_report(&evaluation)?;

        Ok(TrainReport {
            best_epoch: outcome.best_epoch,
            best_val_loss: outcome.best_val_loss,
            epochs_run: outcome.history.epochs(),
            stopped_early: outcome.stopped_early,
            evaluation,
            majority_baseline,
            artifacts_dir: store.dir().to_path_buf(),
        })
    }
}
