// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the best model using Burn's
// NamedMpkGzFileRecorder at full precision, so a reloaded model
// reproduces the saved one's logits exactly.
//
// What gets saved per checkpoint:
//   1. model.mpk.gz      — all learned parameters + BN running stats
//   2. optimizer.mpk.gz  — Adam moment estimates (needed to resume)
//   3. checkpoint.json   — epoch, best val loss, TabNetConfig,
//                          training history
//
// File layout:
//   <artifacts>/checkpoint/
//     model.mpk.gz
//     optimizer.mpk.gz
//     checkpoint.json       ← commit marker, renamed into place LAST
//     train_config.json     ← the run's TrainConfig, for traceability
//
// Every file is first written under a "-staged" / ".tmp" name.
// The previous checkpoint.json is removed before the staged
// weights are renamed over the old ones, and the new
// checkpoint.json appears only after both renames. A reader that
// finds checkpoint.json therefore always finds the weights that
// belong to it; an interrupted save leaves no checkpoint at all.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::error::InitializationError;
use crate::infra::artifact_store::{read_artifact, write_atomic};
use crate::infra::metrics::TrainingHistory;
use crate::ml::model::{TabNetClassifier, TabNetConfig};

pub const CHECKPOINT_DIR: &str = "checkpoint";

const MODEL_STEM: &str     = "model";
const OPTIMIZER_STEM: &str = "optimizer";
const STAGED_SUFFIX: &str  = "-staged";
const RECORD_EXT: &str     = "mpk.gz";
const META_FILE: &str      = "checkpoint.json";
const CONFIG_FILE: &str    = "train_config.json";

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Everything in the checkpoint besides the tensors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Epoch whose weights are stored (1-based)
    pub epoch:         usize,
    pub best_val_loss: f64,
    pub model:         TabNetConfig,
    pub history:       TrainingHistory,
}

/// Manages the single best-model checkpoint under `<artifacts>/checkpoint/`.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point at `<artifacts_dir>/checkpoint`. Nothing is created until a save.
    pub fn new(artifacts_dir: impl AsRef<Path>) -> Self {
        Self { dir: artifacts_dir.as_ref().join(CHECKPOINT_DIR) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True once a complete checkpoint has been committed.
    pub fn exists(&self) -> bool {
        self.meta_path().is_file()
    }

    fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    fn stem(&self, stem: &str) -> PathBuf {
        self.dir.join(stem)
    }

    fn record_file(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{RECORD_EXT}"))
    }

    fn staged_file(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}{STAGED_SUFFIX}.{RECORD_EXT}"))
    }

    /// Persist model weights, optimizer state and metadata as one checkpoint,
    /// replacing the previous one.
    pub fn save<B, O>(&self, model: &TabNetClassifier<B>, optim: &O, meta: &CheckpointMeta) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<TabNetClassifier<B>, B>,
    {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))?;
        let recorder = CheckpointRecorder::new();

        // ── Stage everything ──────────────────────────────────────────────────
        // The recorder appends ".mpk.gz" to the path it is given.
        let staged_model = self.stem(&format!("{MODEL_STEM}{STAGED_SUFFIX}"));
        recorder
            .record(model.clone().into_record(), staged_model)
            .with_context(|| format!("Failed to stage model weights in '{}'", self.dir.display()))?;

        let staged_optim = self.stem(&format!("{OPTIMIZER_STEM}{STAGED_SUFFIX}"));
        recorder
            .record(optim.to_record(), staged_optim)
            .with_context(|| format!("Failed to stage optimizer state in '{}'", self.dir.display()))?;

        let meta_json = serde_json::to_vec_pretty(meta)?;

        // ── Commit ────────────────────────────────────────────────────────────
        let meta_path = self.meta_path();
        if meta_path.exists() {
            fs::remove_file(&meta_path)
                .with_context(|| format!("Cannot retire '{}'", meta_path.display()))?;
        }
        for stem in [MODEL_STEM, OPTIMIZER_STEM] {
            fs::rename(self.staged_file(stem), self.record_file(stem))
                .with_context(|| format!("Cannot move staged {stem} record into place"))?;
        }
        write_atomic(&meta_path, &meta_json)
            .with_context(|| format!("Cannot write '{}'", meta_path.display()))?;

        tracing::debug!(
            "Saved checkpoint: epoch {} (val_loss={:.4})",
            meta.epoch,
            meta.best_val_loss
        );
        Ok(())
    }

    /// Retire the committed checkpoint. The commit marker goes first, so an
    /// interrupted clear still leaves nothing a reader would load.
    pub fn clear(&self) -> Result<()> {
        let meta_path = self.meta_path();
        if meta_path.exists() {
            fs::remove_file(&meta_path)
                .with_context(|| format!("Cannot retire '{}'", meta_path.display()))?;
        }
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("Cannot remove checkpoint directory '{}'", self.dir.display()))?;
            tracing::info!("Removed previous checkpoint in '{}'", self.dir.display());
        }
        Ok(())
    }

    pub fn load_meta(&self) -> Result<CheckpointMeta, InitializationError> {
        let path = self.meta_path();
        let bytes = read_artifact(&path)?;
        serde_json::from_slice(&bytes).map_err(|e| InitializationError::corrupt(&path, e))
    }

    /// Rebuild the architecture from `config` and load the committed weights into it.
    pub fn load_model<B: Backend>(
        &self,
        config: &TabNetConfig,
        device: &B::Device,
    ) -> Result<TabNetClassifier<B>, InitializationError> {
        config.validate().map_err(InitializationError::InvalidConfig)?;
        let file = self.record_file(MODEL_STEM);
        if !self.exists() || !file.is_file() {
            return Err(InitializationError::MissingArtifact { path: file });
        }

        let record = CheckpointRecorder::new()
            .load(self.stem(MODEL_STEM), device)
            .map_err(|e| InitializationError::corrupt(&file, e))?;

        let model: TabNetClassifier<B> = config.init(device);
        Ok(model.load_record(record))
    }

    /// Restore the optimizer state saved alongside the weights.
    pub fn load_optimizer<B, O>(&self, optim: O, device: &B::Device) -> Result<O>
    where
        B: AutodiffBackend,
        O: Optimizer<TabNetClassifier<B>, B>,
    {
        let record = CheckpointRecorder::new()
            .load(self.stem(OPTIMIZER_STEM), device)
            .with_context(|| {
                format!("Cannot load optimizer state from '{}'", self.record_file(OPTIMIZER_STEM).display())
            })?;
        Ok(optim.load_record(record))
    }

    /// Save the run configuration next to the checkpoint.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_vec_pretty(cfg)?;
        write_atomic(&path, &json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use burn::optim::{AdamConfig, GradientsParams};
    use burn::tensor::Distribution;

    type AB = Autodiff<NdArray>;
    type IB = NdArray;

    fn meta(config: &TabNetConfig, epoch: usize) -> CheckpointMeta {
        CheckpointMeta {
            epoch,
            best_val_loss: 0.5,
            model: config.clone(),
            history: TrainingHistory::default(),
        }
    }

    #[test]
    fn test_round_trip_reproduces_logits() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = TabNetConfig::new(5).with_virtual_batch_size(4);

        // One optimizer step so weights, running stats and Adam moments are non-trivial.
        let model: TabNetClassifier<AB> = config.init(&device);
        let mut optim = AdamConfig::new().init();
        let x = Tensor::<AB, 2>::random([8, 5], Distribution::Normal(0.0, 1.0), &device);
        let y = Tensor::<AB, 1, Int>::from_ints([0, 1, 0, 1, 1, 0, 0, 1], &device);
        let (loss, _) = model.forward_loss(x, y, 1e-3, true);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        let model = optim.step(1e-2, model, grads);

        manager.save(&model, &optim, &meta(&config, 3)).unwrap();
        assert!(manager.exists());

        let inputs = Tensor::<IB, 2>::random([6, 5], Distribution::Normal(0.0, 1.0), &device);
        let expected = model.valid().forward(inputs.clone(), false).logits.into_data();

        let loaded: TabNetClassifier<IB> = manager.load_model(&config, &device).unwrap();
        let actual = loaded.forward(inputs, false).logits.into_data();
        actual.assert_eq(&expected, true);

        let back = manager.load_meta().unwrap();
        assert_eq!(back.epoch, 3);
        assert_eq!(back.model.input_dim, 5);

        let restored = manager
            .load_optimizer::<AB, _>(AdamConfig::new().init::<AB, TabNetClassifier<AB>>(), &device)
            .unwrap();
        assert_eq!(restored.to_record().len(), optim.to_record().len());
    }

    #[test]
    fn test_second_save_replaces_first_and_leaves_no_staging() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = TabNetConfig::new(3);
        let model: TabNetClassifier<AB> = config.init(&device);
        let optim = AdamConfig::new().init::<AB, TabNetClassifier<AB>>();

        manager.save(&model, &optim, &meta(&config, 1)).unwrap();
        manager.save(&model, &optim, &meta(&config, 2)).unwrap();
        assert_eq!(manager.load_meta().unwrap().epoch, 2);

        let names: Vec<String> = fs::read_dir(manager.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.contains("staged") && !n.ends_with(".tmp")), "{names:?}");
    }

    #[test]
    fn test_clear_retires_committed_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        manager.clear().unwrap();

        let config = TabNetConfig::new(3);
        let model: TabNetClassifier<AB> = config.init(&Default::default());
        let optim = AdamConfig::new().init::<AB, TabNetClassifier<AB>>();
        manager.save(&model, &optim, &meta(&config, 1)).unwrap();
        assert!(manager.exists());

        manager.clear().unwrap();
        assert!(!manager.exists());
        assert!(!manager.dir().exists());
        assert!(matches!(
            manager.load_model::<IB>(&config, &Default::default()),
            Err(InitializationError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn test_missing_checkpoint_is_initialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        assert!(!manager.exists());
        let err = manager
            .load_model::<IB>(&TabNetConfig::new(3), &Default::default())
            .unwrap_err();
        assert!(matches!(err, InitializationError::MissingArtifact { .. }));
        assert!(matches!(manager.load_meta(), Err(InitializationError::MissingArtifact { .. })));
    }

    #[test]
    fn test_damaged_weights_are_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = TabNetConfig::new(3);
        let model: TabNetClassifier<AB> = config.init(&device);
        let optim = AdamConfig::new().init::<AB, TabNetClassifier<AB>>();
        manager.save(&model, &optim, &meta(&config, 1)).unwrap();

        fs::write(manager.dir().join("model.mpk.gz"), b"not a record").unwrap();
        let err = manager.load_model::<IB>(&config, &device).unwrap_err();
        assert!(matches!(err, InitializationError::CorruptArtifact { .. }), "{err}");
    }
}
