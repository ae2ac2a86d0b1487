//! Training configuration and hyperparameter grids

use super::svm::{Gamma, KernelKind, SvmConfig};
use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One point of the hyperparameter grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Regularization strength
    pub c: f64,
    pub kernel: KernelKind,
    pub gamma: Gamma,
}

impl Hyperparameters {
    pub fn new(c: f64, kernel: KernelKind, gamma: Gamma) -> Self {
        Self { c, kernel, gamma }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(ChurnError::InvalidParameter {
                name: "C".to_string(),
                value: self.c.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        self.gamma.validate()
    }

    /// File stem of the artifact trained with these hyperparameters.
    pub fn artifact_stem(&self) -> String {
        format!("churn_model_C{:?}_kernel{}_gamma{}", self.c, self.kernel, self.gamma)
    }
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::Rbf,
            gamma: Gamma::Scale,
        }
    }
}

impl fmt::Display for Hyperparameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C={:?}, kernel={}, gamma={}", self.c, self.kernel, self.gamma)
    }
}

/// Cartesian grid over C × gamma × kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperparameterGrid {
    pub c: Vec<f64>,
    pub gamma: Vec<Gamma>,
    pub kernel: Vec<KernelKind>,
}

impl Default for HyperparameterGrid {
    fn default() -> Self {
        Self {
            c: vec![0.1, 1.0, 10.0],
            gamma: vec![Gamma::Scale, Gamma::Auto],
            kernel: vec![KernelKind::Rbf],
        }
    }
}

impl HyperparameterGrid {
    /// All points, C outermost, then gamma, then kernel.
    pub fn points(&self) -> Vec<Hyperparameters> {
        let mut points = Vec::with_capacity(self.len());
        for &c in &self.c {
            for &gamma in &self.gamma {
                for &kernel in &self.kernel {
                    points.push(Hyperparameters { c, kernel, gamma });
                }
            }
        }
        points
    }

    pub fn len(&self) -> usize {
        self.c.len() * self.gamma.len() * self.kernel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Solver settings shared by every grid point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Maximum SMO passes per fit
    pub max_iter: usize,
    /// SMO stopping tolerance
    pub tol: f64,
    pub random_state: Option<u64>,
    /// Wall-clock budget per grid point, in seconds
    pub point_timeout_secs: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tol: 1e-3,
            random_state: Some(42),
            point_timeout_secs: None,
        }
    }
}

impl TrainingConfig {
    pub fn with_point_timeout(mut self, secs: f64) -> Self {
        self.point_timeout_secs = Some(secs);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// SVM settings for one grid point.
    pub fn svm_config(&self, params: &Hyperparameters) -> SvmConfig {
        SvmConfig {
            c: params.c,
            kernel: params.kernel,
            gamma: params.gamma,
            tol: self.tol,
            max_iter: self.max_iter,
            random_state: self.random_state,
            time_budget: self
                .point_timeout_secs
                .filter(|s| s.is_finite() && *s >= 0.0)
                .map(Duration::from_secs_f64),
            ..SvmConfig::default()
        }
    }
}
