//! Support Vector Machine classifier
//!
//! Binary soft-margin SVC trained with SMO (Sequential Minimal Optimization)
//! over a precomputed kernel matrix.

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel family, as named in hyperparameter grids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Rbf,
    Poly,
    Sigmoid,
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelKind::Linear => "linear",
            KernelKind::Rbf => "rbf",
            KernelKind::Poly => "poly",
            KernelKind::Sigmoid => "sigmoid",
        };
        f.write_str(name)
    }
}

impl FromStr for KernelKind {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(KernelKind::Linear),
            "rbf" => Ok(KernelKind::Rbf),
            "poly" | "polynomial" => Ok(KernelKind::Poly),
            "sigmoid" => Ok(KernelKind::Sigmoid),
            other => Err(ChurnError::InvalidParameter {
                name: "kernel".to_string(),
                value: other.to_string(),
                reason: "expected one of linear, rbf, poly, sigmoid".to_string(),
            }),
        }
    }
}

/// Kernel coefficient
///
/// Serialized as a string (`"scale"`, `"auto"` or a number such as `"0.5"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gamma {
    /// 1 / (n_features * Var(X))
    Scale,
    /// 1 / n_features
    Auto,
    /// Explicit positive value
    Value(f64),
}

impl Gamma {
    /// Resolve to a concrete coefficient for the training matrix `x`.
    pub fn resolve(&self, x: &Array2<f64>) -> f64 {
        let n_features = x.ncols().max(1) as f64;
        match self {
            Gamma::Value(g) => *g,
            Gamma::Auto => 1.0 / n_features,
            Gamma::Scale => {
                let var = if x.is_empty() { 0.0 } else { x.var(0.0) };
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Gamma::Value(g) if !(g.is_finite() && *g > 0.0) => Err(ChurnError::InvalidParameter {
                name: "gamma".to_string(),
                value: g.to_string(),
                reason: "must be 'scale', 'auto' or a positive number".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Gamma {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gamma::Scale => f.write_str("scale"),
            Gamma::Auto => f.write_str("auto"),
            Gamma::Value(g) => write!(f, "{:?}", g),
        }
    }
}

impl FromStr for Gamma {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        let gamma = match s.trim().to_ascii_lowercase().as_str() {
            "scale" => Gamma::Scale,
            "auto" => Gamma::Auto,
            other => Gamma::Value(other.parse::<f64>().map_err(|_| ChurnError::InvalidParameter {
                name: "gamma".to_string(),
                value: other.to_string(),
                reason: "must be 'scale', 'auto' or a positive number".to_string(),
            })?),
        };
        gamma.validate()?;
        Ok(gamma)
    }
}

impl TryFrom<String> for Gamma {
    type Error = ChurnError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Gamma> for String {
    fn from(g: Gamma) -> Self {
        g.to_string()
    }
}

/// Kernel function with resolved coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    RBF { gamma: f64 },
    /// Sigmoid kernel: K(x, y) = tanh(γ * x · y + r)
    Sigmoid { gamma: f64, coef0: f64 },
}

impl KernelType {
    #[inline]
    pub fn eval(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            KernelType::Linear => a.dot(&b),
            KernelType::Polynomial { degree, gamma, coef0 } => {
                (gamma * a.dot(&b) + coef0).powi(degree.min(i32::MAX as u32) as i32)
            }
            KernelType::RBF { gamma } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * norm_sq).exp()
            }
            KernelType::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel family
    pub kernel: KernelKind,
    /// Kernel coefficient for rbf, poly and sigmoid
    pub gamma: Gamma,
    /// Degree of the polynomial kernel
    pub degree: u32,
    /// Independent term of the poly and sigmoid kernels
    pub coef0: f64,
    /// Tolerance for stopping criterion
    pub tol: f64,
    /// Maximum number of passes over the data
    pub max_iter: usize,
    /// Random seed
    pub random_state: Option<u64>,
    /// Wall-clock budget for a single fit
    pub time_budget: Option<Duration>,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelKind::Rbf,
            gamma: Gamma::Scale,
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: 1000,
            random_state: Some(42),
            time_budget: None,
        }
    }
}

/// Support Vector Classifier for two classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    config: SvmConfig,
    /// Kernel with gamma resolved at fit time
    kernel: Option<KernelType>,
    support_vectors: Option<Array2<f64>>,
    /// Alpha coefficients (Lagrange multipliers)
    alphas: Option<Array1<f64>>,
    /// Support vector labels in {-1, +1}
    support_labels: Option<Array1<f64>>,
    bias: f64,
    /// Sorted class labels; `classes[1]` is the positive class
    classes: Vec<i64>,
    n_features: usize,
    is_fitted: bool,
}

impl SvmClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            kernel: None,
            support_vectors: None,
            alphas: None,
            support_labels: None,
            bias: 0.0,
            classes: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &SvmConfig {
        &self.config
    }

    fn validate_config(&self) -> Result<()> {
        if !(self.config.c.is_finite() && self.config.c > 0.0) {
            return Err(ChurnError::InvalidParameter {
                name: "C".to_string(),
                value: self.config.c.to_string(),
                reason: "must be a positive number".to_string(),
            });
        }
        self.config.gamma.validate()
    }

    fn resolve_kernel(&self, x: &Array2<f64>) -> KernelType {
        let gamma = self.config.gamma.resolve(x);
        match self.config.kernel {
            KernelKind::Linear => KernelType::Linear,
            KernelKind::Rbf => KernelType::RBF { gamma },
            KernelKind::Poly => KernelType::Polynomial {
                degree: self.config.degree,
                gamma,
                coef0: self.config.coef0,
            },
            KernelKind::Sigmoid => KernelType::Sigmoid { gamma, coef0: self.config.coef0 },
        }
    }

    /// Fit the classifier on exactly two classes
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.validate_config()?;

        if x.nrows() != y.len() {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("{} labels", x.nrows()),
                actual: format!("{} labels", y.len()),
            });
        }

        // Validate that all labels are integral values (no silent truncation)
        for (i, &v) in y.iter().enumerate() {
            if (v - v.round()).abs() > 1e-9 {
                return Err(ChurnError::Training(format!(
                    "SVM classifier requires integer class labels, but sample {} has label {}",
                    i, v
                )));
            }
        }

        let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
        classes.sort_unstable();
        classes.dedup();

        if classes.len() != 2 {
            return Err(ChurnError::Training(format!(
                "SVM requires exactly 2 distinct classes, found {}",
                classes.len()
            )));
        }
        self.classes = classes;

        let kernel = self.resolve_kernel(x);
        self.kernel = Some(kernel);

        let y_binary: Array1<f64> = y.mapv(|v| if v.round() as i64 == self.classes[1] { 1.0 } else { -1.0 });

        let (alphas, bias, support_indices) = self.smo_train(x, &y_binary, &kernel)?;

        let sv_count = support_indices.len();
        let n_features = x.ncols();

        let mut support_vectors = Array2::zeros((sv_count, n_features));
        let mut support_labels = Array1::zeros(sv_count);
        let mut support_alphas = Array1::zeros(sv_count);

        for (i, &idx) in support_indices.iter().enumerate() {
            support_vectors.row_mut(i).assign(&x.row(idx));
            support_labels[i] = y_binary[idx];
            support_alphas[i] = alphas[idx];
        }

        debug!(
            kernel = ?kernel,
            support_vectors = sv_count,
            samples = x.nrows(),
            "SVM fitted"
        );

        self.support_vectors = Some(support_vectors);
        self.support_labels = Some(support_labels);
        self.alphas = Some(support_alphas);
        self.bias = bias;
        self.n_features = n_features;
        self.is_fitted = true;
        Ok(())
    }

    /// SMO training algorithm with an incrementally maintained output cache
    fn smo_train(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        kernel: &KernelType,
    ) -> Result<(Array1<f64>, f64, Vec<usize>)> {
        let n = x.nrows();

        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(ChurnError::Training(format!(
                "Dataset has {} samples, exceeding the maximum {} for SVM kernel matrix. \
                 Consider subsampling.",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let started = Instant::now();
        let c = self.config.c;
        let tol = self.config.tol;

        let mut alphas: Array1<f64> = Array1::zeros(n);
        let mut bias = 0.0;
        // outputs[k] = sum_m alpha_m * y_m * K(m, k) + bias
        let mut outputs: Array1<f64> = Array1::zeros(n);

        let kernel_matrix = compute_kernel_matrix(x, kernel);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut passes = 0;
        let max_passes = 5;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.config.max_iter {
            if n <= 1 {
                break;
            }

            let mut num_changed = 0;

            for i in 0..n {
                if i % 256 == 0 {
                    self.check_budget(started, total_iter)?;
                }

                let e_i = outputs[i] - y[i];

                // Check KKT conditions
                if !((y[i] * e_i < -tol && alphas[i] < c) || (y[i] * e_i > tol && alphas[i] > 0.0)) {
                    continue;
                }

                // Select j randomly (safe: n > 1 guaranteed above)
                let j = loop {
                    let j = rng.gen_range(0..n);
                    if j != i {
                        break j;
                    }
                };

                let e_j = outputs[j] - y[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                // Compute bounds
                let (l, h) = if y[i] != y[j] {
                    ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
                } else {
                    ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
                };

                if (l - h).abs() < 1e-10 {
                    continue;
                }

                let k_ii = kernel_matrix[[i, i]];
                let k_jj = kernel_matrix[[j, j]];
                let k_ij = kernel_matrix[[i, j]];

                let eta = 2.0 * k_ij - k_ii - k_jj;
                if eta >= 0.0 {
                    continue;
                }

                let alpha_j_new = (alpha_j_old - y[j] * (e_i - e_j) / eta).max(l).min(h);
                if (alpha_j_new - alpha_j_old).abs() < 1e-5 {
                    continue;
                }
                let alpha_i_new = alpha_i_old + y[i] * y[j] * (alpha_j_old - alpha_j_new);

                let d_i = alpha_i_new - alpha_i_old;
                let d_j = alpha_j_new - alpha_j_old;

                let b1 = bias - e_i - y[i] * d_i * k_ii - y[j] * d_j * k_ij;
                let b2 = bias - e_j - y[i] * d_i * k_ij - y[j] * d_j * k_jj;

                let new_bias = if alpha_i_new > 0.0 && alpha_i_new < c {
                    b1
                } else if alpha_j_new > 0.0 && alpha_j_new < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                let d_b = new_bias - bias;
                let row_i = kernel_matrix.row(i);
                let row_j = kernel_matrix.row(j);
                let (w_i, w_j) = (y[i] * d_i, y[j] * d_j);
                outputs.zip_mut_with(&row_i, |o, &k| *o += w_i * k);
                outputs.zip_mut_with(&row_j, |o, &k| *o += w_j * k);
                outputs.mapv_inplace(|o| o + d_b);

                alphas[i] = alpha_i_new;
                alphas[j] = alpha_j_new;
                bias = new_bias;
                num_changed += 1;
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        if passes < max_passes && n > 1 {
            warn!(max_iter = self.config.max_iter, "SMO stopped at max_iter before converging");
        }

        // Find support vectors (alpha > 0)
        let support_indices: Vec<usize> = alphas
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, _)| i)
            .collect();

        Ok((alphas, bias, support_indices))
    }

    fn check_budget(&self, started: Instant, iterations: usize) -> Result<()> {
        match self.config.time_budget {
            Some(budget) if started.elapsed() >= budget => Err(ChurnError::TrainingTimeout {
                secs: budget.as_secs_f64(),
                iterations,
            }),
            _ => Ok(()),
        }
    }

    fn fitted_parts(&self) -> Result<(&KernelType, &Array2<f64>, &Array1<f64>, &Array1<f64>)> {
        match (&self.kernel, &self.support_vectors, &self.alphas, &self.support_labels) {
            (Some(k), Some(sv), Some(a), Some(l)) if self.is_fitted => Ok((k, sv, a, l)),
            _ => Err(ChurnError::ModelNotFitted),
        }
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Signed distance to the separating surface; positive means `classes[1]`.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (kernel, sv, alphas, sv_labels) = self.fitted_parts()?;
        self.check_width(x)?;

        let scores = x
            .rows()
            .into_iter()
            .map(|sample| {
                sv.rows()
                    .into_iter()
                    .zip(alphas.iter().zip(sv_labels.iter()))
                    .fold(self.bias, |acc, (v, (a, l))| acc + a * l * kernel.eval(sample, v))
            })
            .collect();
        Ok(scores)
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        let (neg, pos) = (self.classes[0] as f64, self.classes[1] as f64);
        Ok(scores.mapv(|s| if s >= 0.0 { pos } else { neg }))
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map(|sv| sv.nrows()).unwrap_or(0)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Compute kernel matrix (parallelized for large datasets)
fn compute_kernel_matrix(x: &Array2<f64>, kernel: &KernelType) -> Array2<f64> {
    let n = x.nrows();
    let mut k = Array2::zeros((n, n));

    // For small matrices, sequential is faster due to overhead
    if n < 100 {
        for i in 0..n {
            for j in i..n {
                let val = kernel.eval(x.row(i), x.row(j));
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        return k;
    }

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| (i..n).map(|j| kernel.eval(x.row(i), x.row(j))).collect())
        .collect();

    for (i, row_vals) in rows.into_iter().enumerate() {
        for (offset, val) in row_vals.into_iter().enumerate() {
            let j = i + offset;
            k[[i, j]] = val;
            k[[j, i]] = val;
        }
    }
    k
}
