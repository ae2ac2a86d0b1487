//! Model artifacts
//!
//! An artifact bundles the fitted classifier with everything needed to use it
//! again: the ordered feature schema, the fitted encoder/scaler state, the
//! hyperparameters and the accuracies measured at training time.

mod store;

pub use store::{ArtifactStore, DEFAULT_MODEL_NAME, MODEL_EXTENSION};

use crate::error::{ChurnError, Result};
use crate::preprocessing::FittedPreprocessing;
use crate::training::{Hyperparameters, SvmClassifier};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Bumped whenever the serialized layout changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Accuracies recorded when the artifact was trained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetrics {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
}

/// A persisted, self-describing trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub hyperparameters: Hyperparameters,
    pub feature_names: Vec<String>,
    pub preprocessing: FittedPreprocessing,
    pub metrics: ArtifactMetrics,
    pub model: SvmClassifier,
}

impl ModelArtifact {
    pub fn new(
        model: SvmClassifier,
        hyperparameters: Hyperparameters,
        preprocessing: FittedPreprocessing,
        metrics: ArtifactMetrics,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            hyperparameters,
            feature_names: preprocessing.feature_names().to_vec(),
            preprocessing,
            metrics,
            model,
        }
    }

    /// Check the internal consistency of a loaded artifact.
    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("artifact format v{}", ARTIFACT_FORMAT_VERSION),
                actual: format!("artifact format v{}", self.format_version),
            });
        }
        if !self.model.is_fitted() {
            return Err(ChurnError::ModelNotFitted);
        }
        if self.feature_names.len() != self.model.n_features() {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("{} features (model)", self.model.n_features()),
                actual: format!("{} features (schema)", self.feature_names.len()),
            });
        }
        if self.feature_names.as_slice() != self.preprocessing.feature_names() {
            return Err(ChurnError::SchemaMismatch {
                expected: self.preprocessing.feature_names().join(","),
                actual: self.feature_names.join(","),
            });
        }
        Ok(())
    }

    /// Check that `names` is exactly this artifact's feature schema.
    pub fn check_schema(&self, names: &[String]) -> Result<()> {
        if names == self.feature_names.as_slice() {
            Ok(())
        } else {
            Err(ChurnError::SchemaMismatch {
                expected: self.feature_names.join(","),
                actual: names.join(","),
            })
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.model.predict(x)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}
