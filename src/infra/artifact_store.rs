// ============================================================
// Layer 6 — Artifact Store
// ============================================================
// One artifacts directory holds everything a trained model needs:
//
//   <artifacts>/
//     preprocessor.json        ← encoders + scaler + feature order
//     checkpoint/              ← see CheckpointManager
//     metrics.csv, metrics.json
//
// The preprocessing artifact is written to `preprocessor.tmp` and
// renamed into place, so a reader never sees half a file. Loading
// validates it as a unit; any inconsistency is an
// InitializationError, never a partially usable pipeline.

use anyhow::{Context, Result};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use crate::data::preprocessor::{PreprocessingArtifact, PreprocessingPipeline};
use crate::domain::error::InitializationError;
use crate::infra::checkpoint::CheckpointManager;

pub const PREPROCESSOR_FILE: &str = "preprocessor.json";

/// Write `contents` next to `path` under a temporary name, then rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    if let Err(e) = fs::write(&tmp_path, contents) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Read a whole file, mapping "not found" to MissingArtifact.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, InitializationError> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => InitializationError::MissingArtifact { path: path.to_path_buf() },
        _ => InitializationError::corrupt(path, e),
    })
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(PREPROCESSOR_FILE)
    }

    pub fn checkpoints(&self) -> CheckpointManager {
        CheckpointManager::new(&self.dir)
    }

    pub fn save_preprocessor(&self, pipeline: &PreprocessingPipeline) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create artifacts directory '{}'", self.dir.display()))?;
        let path = self.preprocessor_path();
        let json = serde_json::to_vec_pretty(pipeline.artifact())?;
        write_atomic(&path, &json)
            .with_context(|| format!("Cannot write preprocessing artifact '{}'", path.display()))?;
        tracing::info!(
            "Saved preprocessing artifact ({} features) to '{}'",
            pipeline.width(),
            path.display()
        );
        Ok(path)
    }

    pub fn load_preprocessor(&self) -> Result<PreprocessingPipeline, InitializationError> {
        let path = self.preprocessor_path();
        let bytes = read_artifact(&path)?;
        let artifact: PreprocessingArtifact =
            serde_json::from_slice(&bytes).map_err(|e| InitializationError::corrupt(&path, e))?;
        PreprocessingPipeline::from_artifact(artifact).map_err(|reason| InitializationError::corrupt(&path, reason))
    }
}
