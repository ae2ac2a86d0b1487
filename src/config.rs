//! Pipeline configuration
//!
//! Layers, lowest precedence first: built-in defaults, a JSON file,
//! environment variables, command-line flags.

use crate::error::{ChurnError, Result};
use crate::preprocessing::{PreprocessingConfig, RegionEncoding};
use crate::tracking::TrackingConfig;
use crate::training::{HyperparameterGrid, TrainingConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_TRAIN_DATA: &str = "CHURN_TRAIN_DATA";
pub const ENV_TEST_DATA: &str = "CHURN_TEST_DATA";
pub const ENV_MODELS_DIR: &str = "CHURN_MODELS_DIR";
pub const ENV_PREPARED_DIR: &str = "CHURN_PREPARED_DIR";
pub const ENV_REGION_ENCODING: &str = "CHURN_REGION_ENCODING";
pub const ENV_TRACKING_URI: &str = "MLFLOW_TRACKING_URI";

/// Settings for the prepare/train/evaluate commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub train_data: PathBuf,
    pub test_data: PathBuf,
    pub models_dir: PathBuf,
    /// Output of the prepare command
    pub prepared_dir: PathBuf,
    pub region_encoding: RegionEncoding,
    /// Expected number of region categories in the training table
    pub expected_regions: Option<usize>,
    pub grid: HyperparameterGrid,
    pub tracking: TrackingConfig,
    /// Per grid point fit budget
    pub point_timeout_secs: Option<f64>,
    pub max_iter: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            train_data: PathBuf::from("churn_80.csv"),
            test_data: PathBuf::from("churn_20.csv"),
            models_dir: PathBuf::from("models"),
            prepared_dir: PathBuf::from("prepared"),
            region_encoding: RegionEncoding::OneHot,
            expected_regions: None,
            grid: HyperparameterGrid::default(),
            tracking: TrackingConfig::default(),
            point_timeout_secs: None,
            max_iter: TrainingConfig::default().max_iter,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ChurnError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ChurnError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_TRAIN_DATA) {
            self.train_data = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TEST_DATA) {
            self.test_data = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_MODELS_DIR) {
            self.models_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_PREPARED_DIR) {
            self.prepared_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_REGION_ENCODING) {
            self.region_encoding = v.parse()?;
        }
        if let Some(v) = lookup(ENV_TRACKING_URI) {
            self.tracking.uri = v;
        }
        Ok(())
    }

    pub fn preprocessing(&self) -> PreprocessingConfig {
        let config = PreprocessingConfig::default().with_region_encoding(self.region_encoding);
        match self.expected_regions {
            Some(n) => config.with_expected_regions(n),
            None => config,
        }
    }

    pub fn training(&self) -> TrainingConfig {
        let config = TrainingConfig::default().with_max_iter(self.max_iter);
        match self.point_timeout_secs {
            Some(secs) => config.with_point_timeout(secs),
            None => config,
        }
    }
}
