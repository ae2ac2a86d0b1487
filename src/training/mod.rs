//! Model training module
//!
//! Provides training for the churn classifier:
//! - Support Vector Machine (SMO solver) with linear, RBF, polynomial and sigmoid kernels
//! - Single-point training with artifact persistence and run tracking
//! - Exhaustive grid search over C × gamma × kernel

mod config;
mod metrics;
mod selector;
pub mod svm;
mod trainer;

pub use config::{HyperparameterGrid, Hyperparameters, TrainingConfig};
pub use metrics::{accuracy, ConfusionCounts};
pub use selector::{ModelSelector, PointFailure, PointResult, SelectionReport};
pub use svm::{Gamma, KernelKind, KernelType, SvmClassifier, SvmConfig};
pub use trainer::{TrainOutcome, Trainer};
