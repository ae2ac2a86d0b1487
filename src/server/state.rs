//! Prediction service shared across handlers

use super::request::{PredictRequest, Prediction};
use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::error::{ChurnError, Result};
use ndarray::Array2;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Read-only model loaded once at startup
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: Arc<ModelArtifact>,
}

impl PredictionService {
    /// Wrap an artifact, failing if the request schema cannot fill its features.
    pub fn new(artifact: ModelArtifact) -> Result<Self> {
        let missing: Vec<&str> = artifact
            .feature_names
            .iter()
            .map(String::as_str)
            .filter(|name| !PredictRequest::FIELDS.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("features among the request fields {}", PredictRequest::FIELDS.join(",")),
                actual: format!("unservable features {}", missing.join(",")),
            });
        }

        // A request flag is used as the ordinal code, so the fitted categories
        // must sort as No = 0, Yes = 1.
        for feature in ["international_plan", "voice_mail_plan"] {
            let categories = artifact.preprocessing.plan_categories(feature).unwrap_or_default();
            let aligned = categories.len() <= 2
                && categories
                    .iter()
                    .enumerate()
                    .all(|(code, category)| flag_value(category) == Some(code));
            if !aligned {
                return Err(ChurnError::SchemaMismatch {
                    expected: format!("{} categories [No, Yes]", feature),
                    actual: format!("{:?}", categories),
                });
            }
        }

        info!(
            id = %artifact.id,
            params = %artifact.hyperparameters,
            features = artifact.n_features(),
            test_accuracy = artifact.metrics.test_accuracy,
            "Prediction service ready"
        );
        Ok(Self {
            artifact: Arc::new(artifact),
        })
    }

    /// Load an artifact from disk and wrap it.
    pub fn load(path: &Path) -> Result<Self> {
        Self::new(ArtifactStore::load(path)?)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Build the scaled 1 × n design row in artifact feature order.
    pub fn assemble(&self, request: &PredictRequest) -> Result<Array2<f64>> {
        request.validate()?;
        let names = &self.artifact.feature_names;
        let mut row = Array2::zeros((1, names.len()));
        for (j, name) in names.iter().enumerate() {
            let raw = request.value(name).ok_or_else(|| ChurnError::SchemaMismatch {
                expected: name.clone(),
                actual: "no such request field".to_string(),
            })?;
            row[[0, j]] = self.artifact.preprocessing.scale_value(name, raw)?;
        }
        Ok(row)
    }

    pub fn predict(&self, request: &PredictRequest) -> Result<Prediction> {
        let row = self.assemble(request)?;
        let class = self.artifact.predict(&row)?;
        Ok(Prediction::from_class(class[0]))
    }
}

/// Request value a plan category stands for.
fn flag_value(category: &str) -> Option<usize> {
    match category.trim().to_ascii_lowercase().as_str() {
        "no" | "false" | "0" => Some(0),
        "yes" | "true" | "1" => Some(1),
        _ => None,
    }
}
