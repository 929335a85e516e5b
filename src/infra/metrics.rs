// ============================================================
// Layer 6 — Metrics
// ============================================================
// Three things live here:
//
//   EpochMetrics     — one row per epoch, appended to metrics.csv
//   TrainingHistory  — the per-epoch loss/accuracy arrays stored
//                      inside the checkpoint (needed to resume)
//   EvaluationReport — accuracy, precision, recall, F1 and the
//                      confusion matrix on a held-out stream,
//                      written to metrics.json
//
// Example CSV output:
//   epoch,train_loss,val_loss,train_acc,val_acc
//   1,0.684210,0.652301,0.571250,0.615000
//   2,0.611502,0.590144,0.668750,0.700000
//
// Positive class for precision/recall/F1 is High (class 1).
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const CSV_HEADER: &str = "epoch,train_loss,val_loss,train_acc,val_acc";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean composite loss (CE + λ·sparsity) over the training batches
    pub train_loss: f64,

    /// Mean composite loss on the validation stream
    pub val_loss: f64,

    /// Fraction of training samples classified correctly
    pub train_acc: f64,

    /// Fraction of validation samples classified correctly
    pub val_acc: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        val_loss:   f64,
        train_acc:  f64,
        val_acc:    f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, train_acc, val_acc }
    }

    /// Returns true if this epoch improved over the previous best val_loss
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

// ─── TrainingHistory ──────────────────────────────────────────────────────────
/// Cumulative per-epoch curves, index i = epoch i + 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub train_losses: Vec<f64>,
    pub val_losses:   Vec<f64>,
    pub train_accs:   Vec<f64>,
    pub val_accs:     Vec<f64>,
}

impl TrainingHistory {
    pub fn push(&mut self, m: &EpochMetrics) {
        self.train_losses.push(m.train_loss);
        self.val_losses.push(m.val_loss);
        self.train_accs.push(m.train_acc);
        self.val_accs.push(m.val_acc);
    }

    pub fn epochs(&self) -> usize {
        self.val_losses.len()
    }

    /// Keep only the first `epochs` entries of every curve.
    pub fn truncate(&mut self, epochs: usize) {
        self.train_losses.truncate(epochs);
        self.val_losses.truncate(epochs);
        self.train_accs.truncate(epochs);
        self.val_accs.truncate(epochs);
    }
}

// ─── EvaluationReport ─────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    /// Rows are true labels, columns predicted labels: [[TN, FP], [FN, TP]]
    pub confusion_matrix: [[usize; 2]; 2],
    pub samples: usize,
}

impl EvaluationReport {
    /// Zero-denominator ratios are reported as 0.
    pub fn from_predictions(predictions: &[usize], labels: &[usize]) -> Self {
        let mut cm = [[0usize; 2]; 2];
        for (&p, &y) in predictions.iter().zip(labels) {
            cm[y.min(1)][p.min(1)] += 1;
        }
        let [[tn, fp], [fn_, tp]] = cm;
        let samples = tn + fp + fn_ + tp;

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let precision = ratio(tp, tp + fp);
        let recall    = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: ratio(tp + tn, samples),
            precision,
            recall,
            f1,
            confusion_matrix: cm,
            samples,
        }
    }
}

// ─── MetricsLogger ────────────────────────────────────────────────────────────
/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
    dir:      PathBuf,
}

impl MetricsLogger {
    /// Open `metrics.csv` in `dir`. A fresh run truncates it;
    /// a resumed run appends after the rows already present.
    pub fn new(dir: impl AsRef<Path>, append: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !append || !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{CSV_HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path, dir })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.train_acc,
            m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    /// Write the final held-out evaluation to `metrics.json`.
    pub fn write_report(&self, report: &EvaluationReport) -> Result<PathBuf> {
        let path = self.dir.join("metrics.json");
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!("Evaluation report written to '{}'", path.display());
        Ok(path)
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
