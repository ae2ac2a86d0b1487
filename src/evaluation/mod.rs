//! Model evaluation
//!
//! Scores a persisted artifact on a held-out split.

mod report;

pub use report::{ClassMetrics, ClassificationReport, CLASS_NAMES};

use crate::artifact::ModelArtifact;
use crate::error::{ChurnError, Result};
use crate::preprocessing::PreparedData;
use crate::training::ConfusionCounts;
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Accuracy, confusion matrix and per-class report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    /// `[[tn, fp], [fn, tp]]`, rows actual, columns predicted
    pub confusion_matrix: [[usize; 2]; 2],
    pub report: ClassificationReport,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [[tn, fp], [fn_, tp]] = self.confusion_matrix;
        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows actual, columns predicted):")?;
        writeln!(f, "{:>12} {:>10} {:>10}", "", CLASS_NAMES[0], CLASS_NAMES[1])?;
        writeln!(f, "{:>12} {:>10} {:>10}", CLASS_NAMES[0], tn, fp)?;
        writeln!(f, "{:>12} {:>10} {:>10}", CLASS_NAMES[1], fn_, tp)?;
        writeln!(f)?;
        write!(f, "{}", self.report)
    }
}

/// Scores artifacts; has no side effects
pub struct Evaluator;

impl Evaluator {
    /// Score `artifact` on a design matrix already laid out in its schema.
    pub fn evaluate(artifact: &ModelArtifact, x: &Array2<f64>, y: &Array1<f64>) -> Result<Evaluation> {
        if x.nrows() != y.len() {
            return Err(ChurnError::DataError(format!(
                "{} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if x.ncols() != artifact.n_features() {
            return Err(ChurnError::SchemaMismatch {
                expected: format!("{} features", artifact.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions = artifact.predict(x)?;
        let counts = ConfusionCounts::compute(y, &predictions);
        let evaluation = Evaluation {
            accuracy: counts.accuracy(),
            confusion_matrix: counts.matrix(),
            report: ClassificationReport::from_counts(&counts),
        };

        info!(
            accuracy = evaluation.accuracy,
            samples = y.len(),
            params = %artifact.hyperparameters,
            "Evaluation complete"
        );
        Ok(evaluation)
    }

    /// Score on a raw held-out table, transformed with the encoder and scaler
    /// state persisted in the artifact.
    pub fn evaluate_table(artifact: &ModelArtifact, table: &DataFrame) -> Result<Evaluation> {
        let (x, y) = artifact.preprocessing.transform(table)?;
        Self::evaluate(artifact, &x, &y)
    }

    /// Score on the test split, checking feature names as well as width.
    pub fn evaluate_prepared(artifact: &ModelArtifact, data: &PreparedData) -> Result<Evaluation> {
        artifact.check_schema(&data.feature_names)?;
        Self::evaluate(artifact, &data.x_test, &data.y_test)
    }
}
