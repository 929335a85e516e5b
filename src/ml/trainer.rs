// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on an Autodiff backend; model.valid() gives the
//     same weights on the inner backend for validation.
//   - The training stream is shuffled with a fixed seed and
//     re-shuffled every epoch; the validation stream keeps order.
//   - Loss = CE + λ · sparsity, on both streams.
//   - A batch whose loss is not finite is logged and skipped: no
//     optimizer step, and the batch-norm running statistics its
//     forward pass already wrote are put back. More than
//     `non_finite_tolerance` such batches in one epoch stops
//     training with Diverged.
//   - Each improving validation epoch overwrites the checkpoint;
//     `patience` epochs without improvement stop the loop.
//   - The best checkpoint is reloaded at the end, so the returned
//     model is exactly the one on disk.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, Result};
use std::sync::Arc;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{StudentBatch, StudentBatcher},
    dataset::StudentDataset,
};
use crate::domain::error::{InitializationError, TrainingError};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    metrics::{EpochMetrics, EvaluationReport, MetricsLogger, TrainingHistory},
};
use crate::ml::model::{TabNetClassifier, TabNetConfig};
use crate::ml::{default_device, InferBackend, TrainBackend};

/// What a finished run hands back.
pub struct TrainingOutcome<B: Backend> {
    /// Best model, reloaded from the checkpoint
    pub model:         TabNetClassifier<B>,
    pub config:        TabNetConfig,
    pub history:       TrainingHistory,
    pub best_epoch:    usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
}

pub fn run_training(
    cfg:          &TrainConfig,
    model_cfg:    TabNetConfig,
    train:        StudentDataset,
    val:          StudentDataset,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainingOutcome<InferBackend>> {
    let device = default_device();
    tracing::info!("Using device: {:?}", device);
    train_loop::<TrainBackend>(cfg, model_cfg, train, val, ckpt_manager, metrics, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    model_cfg:    TabNetConfig,
    train:        StudentDataset,
    val:          StudentDataset,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       B::Device,
) -> Result<TrainingOutcome<B::InnerBackend>> {
    if train.sample_count() == 0 {
        return Err(TrainingError::EmptyDataset("training").into());
    }
    if val.sample_count() == 0 {
        return Err(TrainingError::EmptyDataset("validation").into());
    }
    model_cfg.validate().map_err(InitializationError::InvalidConfig)?;
    B::seed(cfg.seed);

    // ── Build model + Adam ────────────────────────────────────────────────────
    let mut model_cfg = model_cfg;
    let mut model: TabNetClassifier<B> = model_cfg.init(&device);
    let mut optim = AdamConfig::new().init::<B, TabNetClassifier<B>>();

    let mut history       = TrainingHistory::default();
    let mut best_val_loss = f64::INFINITY;
    let mut best_epoch    = 0usize;
    let mut start_epoch   = 1usize;

    // ── Resume ────────────────────────────────────────────────────────────────
    if cfg.resume && ckpt_manager.exists() {
        let meta = ckpt_manager.load_meta()?;
        if meta.model.input_dim != model_cfg.input_dim {
            return Err(InitializationError::DimensionMismatch {
                expected: meta.model.input_dim,
                actual:   model_cfg.input_dim,
            }
            .into());
        }
        let changed = architecture_changes(&model_cfg, &meta.model);
        if !changed.is_empty() {
            tracing::warn!(
                "Resuming keeps the checkpoint's architecture; ignoring requested {}",
                changed.join(", ")
            );
        }
        model = ckpt_manager.load_model::<B>(&meta.model, &device)?;
        optim = ckpt_manager.load_optimizer(optim, &device)?;
        model_cfg     = meta.model;
        history       = meta.history;
        history.truncate(meta.epoch);
        best_val_loss = meta.best_val_loss;
        best_epoch    = meta.epoch;
        start_epoch   = meta.epoch + 1;
        tracing::info!(
            "Resuming from checkpoint at epoch {} (best val_loss={:.4})",
            meta.epoch,
            meta.best_val_loss
        );
    } else if cfg.resume {
        tracing::warn!("--resume given but no checkpoint in '{}'; starting fresh", ckpt_manager.dir().display());
    }

    tracing::info!(
        "Model ready: {} steps, n_d={}, n_a={}, {} parameters",
        model_cfg.n_steps,
        model_cfg.n_d,
        model_cfg.n_a,
        model.num_params()
    );

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(StudentBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train);

    let val_loader = DataLoaderBuilder::new(StudentBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    let mut patience_counter = 0usize;
    let mut stopped_early    = false;

    for epoch in start_epoch..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum   = 0.0f64;
        let mut finite     = 0usize;
        let mut non_finite = 0usize;
        let mut batches    = 0usize;
        let mut correct    = 0usize;
        let mut seen       = 0usize;

        for batch in train_loader.iter() {
            batches += 1;
            let labels = batch.labels.clone();
            // BatchNorm updates its running statistics inside forward.
            let before = model.clone().into_record();
            let (loss, output) = model.forward_loss(batch.features, batch.labels, cfg.lambda_sparse, true);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            if !loss_val.is_finite() {
                model = model.load_record(before);
                non_finite += 1;
                tracing::warn!("Epoch {epoch}: batch {batches} produced loss {loss_val}; skipping update");
                if non_finite > cfg.non_finite_tolerance {
                    return Err(TrainingError::Diverged { epoch, non_finite, batches }.into());
                }
                continue;
            }
            loss_sum += loss_val;
            finite   += 1;
            seen     += labels.dims()[0];
            correct  += count_correct(output.logits, labels);

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if finite > 0 { loss_sum / finite as f64 } else { f64::NAN };
        let train_acc  = if seen > 0 { correct as f64 / seen as f64 } else { 0.0 };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let val = evaluate_stream(&model_valid, &val_loader, cfg.lambda_sparse)?;

        let m = EpochMetrics::new(epoch, train_loss, val.loss, train_acc, val.accuracy);
        history.push(&m);
        metrics.log(&m)?;

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | train_acc={:.1}% | val_acc={:.1}%",
            epoch, cfg.epochs, m.train_loss, m.val_loss,
            m.train_acc * 100.0, m.val_acc * 100.0,
        );

        // ── Checkpoint / early stopping ───────────────────────────────────────
        if m.is_improvement(best_val_loss) {
            best_val_loss    = m.val_loss;
            best_epoch       = epoch;
            patience_counter = 0;
            let meta = CheckpointMeta {
                epoch,
                best_val_loss,
                model:   model_cfg.clone(),
                history: history.clone(),
            };
            ckpt_manager.save(&model, &optim, &meta)?;
            tracing::info!("Checkpoint saved for epoch {} (val_loss={:.4})", epoch, best_val_loss);
        } else {
            patience_counter += 1;
            if patience_counter >= cfg.patience {
                tracing::info!(
                    "Early stopping at epoch {}: no improvement for {} epochs (best epoch {})",
                    epoch, patience_counter, best_epoch
                );
                stopped_early = true;
                break;
            }
        }
    }

    if best_epoch == 0 {
        return Err(TrainingError::NoCheckpoint.into());
    }

    let best = ckpt_manager.load_model::<B::InnerBackend>(&model_cfg, &device)?;
    tracing::info!("Training complete! Best epoch {} (val_loss={:.4})", best_epoch, best_val_loss);

    Ok(TrainingOutcome {
        model: best,
        config: model_cfg,
        history,
        best_epoch,
        best_val_loss,
        stopped_early,
    })
}

/// Architecture knobs where `requested` differs from `saved`, as "name=requested (saved)".
fn architecture_changes(requested: &TabNetConfig, saved: &TabNetConfig) -> Vec<String> {
    let mut changed = Vec::new();
    let mut check = |name: &str, a: String, b: String| {
        if a != b {
            changed.push(format!("{name}={a} (checkpoint has {b})"));
        }
    };
    check("num_classes", requested.num_classes.to_string(), saved.num_classes.to_string());
    check("n_steps", requested.n_steps.to_string(), saved.n_steps.to_string());
    check("n_d", requested.n_d.to_string(), saved.n_d.to_string());
    check("n_a", requested.n_a.to_string(), saved.n_a.to_string());
    check("n_shared", requested.n_shared.to_string(), saved.n_shared.to_string());
    check("n_independent", requested.n_independent.to_string(), saved.n_independent.to_string());
    check("virtual_batch_size", requested.virtual_batch_size.to_string(), saved.virtual_batch_size.to_string());
    check("momentum", requested.momentum.to_string(), saved.momentum.to_string());
    check("gamma", requested.gamma.to_string(), saved.gamma.to_string());
    changed
}

// ─── Evaluation ───────────────────────────────────────────────────────────────
struct StreamStats {
    loss:        f64,
    accuracy:    f64,
    predictions: Vec<usize>,
    labels:      Vec<usize>,
}

fn evaluate_stream<B: Backend>(
    model:         &TabNetClassifier<B>,
    loader:        &Arc<dyn DataLoader<StudentBatch<B>>>,
    lambda_sparse: f64,
) -> Result<StreamStats> {
    let mut loss_sum    = 0.0f64;
    let mut batches     = 0usize;
    let mut predictions = Vec::new();
    let mut labels      = Vec::new();

    for batch in loader.iter() {
        let (loss, output) = model.forward_loss(batch.features, batch.labels.clone(), lambda_sparse, false);
        loss_sum += loss.into_scalar().elem::<f64>();
        batches  += 1;
        predictions.extend(to_indices(output.logits.argmax(1).flatten::<1>(0, 1))?);
        labels.extend(to_indices(batch.labels)?);
    }

    let correct = predictions.iter().zip(&labels).filter(|(p, y)| p == y).count();
    Ok(StreamStats {
        loss:     if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
        accuracy: if labels.is_empty() { 0.0 } else { correct as f64 / labels.len() as f64 },
        predictions,
        labels,
    })
}

/// Accuracy, precision, recall, F1 and confusion matrix on a held-out set.
/// Runs in inference mode; the model is not modified.
pub fn evaluate<B: Backend>(
    model:      &TabNetClassifier<B>,
    dataset:    StudentDataset,
    batch_size: usize,
    device:     &B::Device,
) -> Result<EvaluationReport> {
    if dataset.sample_count() == 0 {
        return Err(TrainingError::EmptyDataset("evaluation").into());
    }
    let loader = DataLoaderBuilder::new(StudentBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .num_workers(1)
        .build(dataset);
    let stats = evaluate_stream(model, &loader, 0.0)?;
    Ok(EvaluationReport::from_predictions(&stats.predictions, &stats.labels))
}

fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let hits: i64 = logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    hits as usize
}

fn to_indices<B: Backend>(t: Tensor<B, 1, Int>) -> Result<Vec<usize>> {
    let values = t
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("cannot read tensor data: {e:?}"))?;
    Ok(values.into_iter().map(|v| v.max(0) as usize).collect())
}
