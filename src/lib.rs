//! Churn Pipeline - customer churn prediction
//!
//! This crate provides the full churn workflow:
//! - Data preparation (imputation, encoding, min-max scaling)
//! - SVM training with an exhaustive hyperparameter grid search
//! - Evaluation with a per-class classification report
//! - An HTTP prediction service over the promoted model
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Raw tables to aligned feature matrices
//! - [`training`] - SVM solver, trainer and grid search
//! - [`evaluation`] - Accuracy, confusion matrix, classification report
//! - [`artifact`] - Self-describing persisted models
//!
//! ## Infrastructure
//! - [`tracking`] - Experiment tracking (MLflow, local file)
//! - [`config`] - Layered pipeline configuration
//! - [`synthetic`] - Seeded synthetic customer tables
//!
//! ## Services
//! - [`server`] - HTTP prediction service
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core
pub mod preprocessing;
pub mod training;
pub mod evaluation;
pub mod artifact;

// Infrastructure
pub mod tracking;
pub mod config;
pub mod synthetic;

// Services
pub mod server;
pub mod cli;

pub use error::{ChurnError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ChurnError, Result};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Preprocessing
    pub use crate::preprocessing::{DataPreparer, PreparedData, PreprocessingConfig, RegionEncoding};

    // Training
    pub use crate::training::{
        Gamma, HyperparameterGrid, Hyperparameters, KernelKind, ModelSelector, SelectionReport, Trainer,
        TrainingConfig,
    };

    // Evaluation
    pub use crate::evaluation::{ClassificationReport, Evaluation, Evaluator};

    // Artifacts
    pub use crate::artifact::{ArtifactStore, ModelArtifact};

    // Experiment tracking
    pub use crate::tracking::{RunRecord, RunTracker, TrackingConfig};

    // Serving
    pub use crate::server::{PredictRequest, PredictionService, ServerConfig};
}
