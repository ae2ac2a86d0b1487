//! Single-point training
//!
//! Fits one SVM for one hyperparameter triple, scores it on both splits,
//! persists the artifact and reports the run to the tracker.

use super::metrics::accuracy;
use super::{Hyperparameters, SvmClassifier, TrainingConfig};
use crate::artifact::{ArtifactMetrics, ArtifactStore, ModelArtifact};
use crate::error::Result;
use crate::preprocessing::PreparedData;
use crate::tracking::{NoopTracker, RunRecord, RunTracker};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of training one grid point
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub artifact: ModelArtifact,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub artifact_path: PathBuf,
    pub duration: Duration,
}

/// Trains and persists churn models
pub struct Trainer {
    store: ArtifactStore,
    tracker: Arc<dyn RunTracker>,
    config: TrainingConfig,
}

impl Trainer {
    /// Trainer with tracking disabled
    pub fn new(store: ArtifactStore, config: TrainingConfig) -> Self {
        Self {
            store,
            tracker: Arc::new(NoopTracker),
            config,
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn RunTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit, score, persist under the hyperparameter-derived name and track.
    pub fn train(&self, data: &PreparedData, params: Hyperparameters) -> Result<TrainOutcome> {
        let (artifact, duration) = self.fit(data, params)?;
        let artifact_path = self.store.save(&artifact)?;
        Ok(self.finish(artifact, artifact_path, duration))
    }

    /// Retrain with fixed hyperparameters and write straight to the default model.
    pub fn retrain(&self, data: &PreparedData, params: Hyperparameters) -> Result<TrainOutcome> {
        let (artifact, duration) = self.fit(data, params)?;
        let artifact_path = self.store.promote_default(&artifact)?;
        Ok(self.finish(artifact, artifact_path, duration))
    }

    /// Fit and score without touching the store.
    pub fn fit(&self, data: &PreparedData, params: Hyperparameters) -> Result<(ModelArtifact, Duration)> {
        params.validate()?;
        info!(
            c = params.c,
            kernel = %params.kernel,
            gamma = %params.gamma,
            n_samples = data.x_train.nrows(),
            n_features = data.n_features(),
            "Training model"
        );

        let start = Instant::now();
        let mut model = SvmClassifier::new(self.config.svm_config(&params));
        model.fit(&data.x_train, &data.y_train)?;

        let train_accuracy = accuracy(&data.y_train, &model.predict(&data.x_train)?);
        let test_accuracy = accuracy(&data.y_test, &model.predict(&data.x_test)?);
        let duration = start.elapsed();

        info!(
            train_accuracy,
            test_accuracy,
            support_vectors = model.n_support_vectors(),
            elapsed_ms = duration.as_millis() as u64,
            "Model trained"
        );

        let artifact = ModelArtifact::new(
            model,
            params,
            data.preprocessing.clone(),
            ArtifactMetrics {
                train_accuracy,
                test_accuracy,
            },
        );
        Ok((artifact, duration))
    }

    fn finish(&self, artifact: ModelArtifact, artifact_path: PathBuf, duration: Duration) -> TrainOutcome {
        let finished_at = Utc::now();
        let started_at = chrono::Duration::from_std(duration)
            .map(|d| finished_at - d)
            .unwrap_or(finished_at);

        let record = RunRecord {
            run_id: artifact.id.clone(),
            hyperparameters: artifact.hyperparameters,
            train_accuracy: artifact.metrics.train_accuracy,
            test_accuracy: artifact.metrics.test_accuracy,
            artifact: artifact_path.display().to_string(),
            started_at,
            finished_at,
        };

        if let Err(e) = self.tracker.log_run(&record) {
            warn!(tracker = self.tracker.name(), error = %e, "Failed to log run, continuing");
        }

        TrainOutcome {
            train_accuracy: artifact.metrics.train_accuracy,
            test_accuracy: artifact.metrics.test_accuracy,
            artifact,
            artifact_path,
            duration,
        }
    }
}
