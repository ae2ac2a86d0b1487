//! Experiment tracking
//!
//! Every trained grid point is reported to a [`RunTracker`]. Backends:
//! - [`MlflowTracker`] - MLflow tracking server over its REST API
//! - [`LocalRunStore`] - append-only JSON file on disk
//! - [`NoopTracker`] - tracking disabled

mod mlflow;
mod storage;

pub use mlflow::MlflowTracker;
pub use storage::LocalRunStore;

use crate::error::Result;
use crate::training::Hyperparameters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// One training run as reported to the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub hyperparameters: Hyperparameters,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    /// Where the fitted artifact was written
    pub artifact: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Sink for training run records
pub trait RunTracker: Send + Sync {
    /// Record a finished run
    fn log_run(&self, record: &RunRecord) -> Result<()>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Tracking disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl RunTracker for NoopTracker {
    fn log_run(&self, _record: &RunRecord) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Tracking backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingBackend {
    #[default]
    Mlflow,
    Local,
    None,
}

/// Tracking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub backend: TrackingBackend,
    /// MLflow server URI
    pub uri: String,
    pub experiment_id: String,
    /// Directory of the local run store
    pub local_dir: PathBuf,
    /// Per-request timeout for remote backends
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            backend: TrackingBackend::Mlflow,
            uri: "http://localhost:5000".to_string(),
            experiment_id: "0".to_string(),
            local_dir: PathBuf::from("./runs"),
            timeout_secs: 5,
        }
    }
}

impl TrackingConfig {
    /// Build the configured tracker
    pub fn build(&self) -> Result<Arc<dyn RunTracker>> {
        Ok(match self.backend {
            TrackingBackend::Mlflow => Arc::new(MlflowTracker::new(
                &self.uri,
                &self.experiment_id,
                Duration::from_secs(self.timeout_secs),
            )?),
            TrackingBackend::Local => Arc::new(LocalRunStore::new(self.local_dir.clone())),
            TrackingBackend::None => Arc::new(NoopTracker),
        })
    }
}
