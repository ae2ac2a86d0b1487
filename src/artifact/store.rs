//! File-based artifact storage

use super::ModelArtifact;
use crate::error::{ChurnError, Result};
use crate::training::Hyperparameters;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File stem of the promoted model read by evaluation and serving.
pub const DEFAULT_MODEL_NAME: &str = "churn_model";

pub const MODEL_EXTENSION: &str = "bin";

/// Directory of model artifacts. Writes are atomic; the last write wins.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the artifact for a grid point.
    pub fn path_for(&self, params: &Hyperparameters) -> PathBuf {
        self.path_named(&params.artifact_stem())
    }

    /// Path of the default model.
    pub fn default_path(&self) -> PathBuf {
        self.path_named(DEFAULT_MODEL_NAME)
    }

    fn path_named(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{}.{}", stem, MODEL_EXTENSION))
    }

    /// Save under the hyperparameter-derived name.
    pub fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let path = self.path_for(&artifact.hyperparameters);
        write_atomic(&path, artifact)?;
        info!(path = %path.display(), params = %artifact.hyperparameters, "Model saved");
        Ok(path)
    }

    /// Save under the default name.
    pub fn promote_default(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let path = self.default_path();
        write_atomic(&path, artifact)?;
        info!(
            path = %path.display(),
            params = %artifact.hyperparameters,
            test_accuracy = artifact.metrics.test_accuracy,
            "Default model updated"
        );
        Ok(path)
    }

    pub fn load_default(&self) -> Result<ModelArtifact> {
        Self::load(&self.default_path())
    }

    pub fn load_for(&self, params: &Hyperparameters) -> Result<ModelArtifact> {
        Self::load(&self.path_for(params))
    }

    /// Load and validate an artifact from any path.
    pub fn load(path: &Path) -> Result<ModelArtifact> {
        if !path.exists() {
            return Err(ChurnError::ModelNotFound { path: path.to_path_buf() });
        }
        let reader = BufReader::new(File::open(path)?);
        let artifact: ModelArtifact = bincode::deserialize_from(reader)?;
        artifact.validate()?;
        debug!(path = %path.display(), id = %artifact.id, "Model loaded");
        Ok(artifact)
    }
}

fn write_atomic(path: &Path, artifact: &ModelArtifact) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| ChurnError::Config(format!("invalid artifact path {}", path.display())))?;
    fs::create_dir_all(dir)?;

    let tmp = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));
    let result = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        bincode::serialize_into(&mut writer, artifact)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}
