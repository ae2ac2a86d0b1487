//! Exhaustive grid search over SVM hyperparameters

use super::trainer::{TrainOutcome, Trainer};
use super::{HyperparameterGrid, Hyperparameters};
use crate::artifact::ModelArtifact;
use crate::error::{ChurnError, Result};
use crate::preprocessing::PreparedData;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Score of one successfully trained grid point
#[derive(Debug, Clone)]
pub struct PointResult {
    pub params: Hyperparameters,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub artifact_path: PathBuf,
    pub duration: Duration,
}

/// A grid point that could not be trained
#[derive(Debug, Clone)]
pub struct PointFailure {
    pub params: Hyperparameters,
    pub error: String,
}

/// Outcome of a full grid search
#[derive(Debug, Clone)]
pub struct SelectionReport {
    pub best: ModelArtifact,
    pub best_params: Hyperparameters,
    pub best_test_accuracy: f64,
    /// Where the winner was promoted
    pub default_path: PathBuf,
    /// In grid order
    pub results: Vec<PointResult>,
    pub failures: Vec<PointFailure>,
}

impl fmt::Display for SelectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<40} {:>10} {:>10} {:>10}", "params", "train", "test", "time (s)")?;
        for r in &self.results {
            writeln!(
                f,
                "{:<40} {:>10.4} {:>10.4} {:>10.2}",
                r.params.to_string(),
                r.train_accuracy,
                r.test_accuracy,
                r.duration.as_secs_f64()
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "{:<40} FAILED: {}", failure.params.to_string(), failure.error)?;
        }
        write!(
            f,
            "best: {} (test accuracy {:.4}) -> {}",
            self.best_params,
            self.best_test_accuracy,
            self.default_path.display()
        )
    }
}

/// Picks the grid point with the best test accuracy
pub struct ModelSelector {
    trainer: Trainer,
}

impl ModelSelector {
    pub fn new(trainer: Trainer) -> Self {
        Self { trainer }
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// Train every grid point and promote the winner to the default model.
    ///
    /// Ties keep the earlier point. A failing point is logged, reported and
    /// skipped; the search only fails if no point could be trained.
    pub fn run(&self, data: &PreparedData, grid: &HyperparameterGrid) -> Result<SelectionReport> {
        let points = grid.points();
        if points.is_empty() {
            return Err(ChurnError::InvalidParameter {
                name: "grid".to_string(),
                value: "[]".to_string(),
                reason: "needs at least one value for C, gamma and kernel".to_string(),
            });
        }

        let total = points.len();
        info!(points = total, "Starting grid search");

        let mut best: Option<TrainOutcome> = None;
        let mut results = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (i, params) in points.into_iter().enumerate() {
            info!(point = i + 1, total, params = %params, "Grid point");
            match self.trainer.train(data, params) {
                Ok(outcome) => {
                    results.push(PointResult {
                        params,
                        train_accuracy: outcome.train_accuracy,
                        test_accuracy: outcome.test_accuracy,
                        artifact_path: outcome.artifact_path.clone(),
                        duration: outcome.duration,
                    });
                    let improves = best
                        .as_ref()
                        .map_or(true, |b| outcome.test_accuracy > b.test_accuracy);
                    if improves {
                        best = Some(outcome);
                    }
                }
                Err(e) => {
                    warn!(params = %params, error = %e, "Grid point failed");
                    failures.push(PointFailure {
                        params,
                        error: e.to_string(),
                    });
                }
            }
        }

        let best = best.ok_or(ChurnError::GridSearchFailed(total))?;
        let default_path = self.trainer.store().promote_default(&best.artifact)?;

        info!(
            best = %best.artifact.hyperparameters,
            test_accuracy = best.test_accuracy,
            failed = failures.len(),
            "Grid search complete"
        );

        Ok(SelectionReport {
            best_params: best.artifact.hyperparameters,
            best_test_accuracy: best.test_accuracy,
            best: best.artifact,
            default_path,
            results,
            failures,
        })
    }

    /// Fit one model and promote it directly to the default name.
    pub fn retrain(&self, data: &PreparedData, params: Hyperparameters) -> Result<TrainOutcome> {
        self.trainer.retrain(data, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactStore;
    use crate::preprocessing::DataPreparer;
    use crate::synthetic::ChurnDataGenerator;
    use crate::training::{Gamma, KernelKind, TrainingConfig};

    fn prepared() -> PreparedData {
        let train = ChurnDataGenerator::new(120, 11).generate().unwrap();
        let test = ChurnDataGenerator::new(40, 12).generate().unwrap();
        DataPreparer::new().prepare_frames(&train, &test).unwrap()
    }

    fn selector(dir: &std::path::Path, config: TrainingConfig) -> ModelSelector {
        ModelSelector::new(Trainer::new(ArtifactStore::new(dir), config))
    }

    #[test]
    fn test_best_point_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let selector = selector(dir.path(), TrainingConfig::default());
        let grid = HyperparameterGrid {
            c: vec![0.1, 10.0],
            gamma: vec![Gamma::Scale],
            kernel: vec![KernelKind::Rbf],
        };

        let report = selector.run(&prepared(), &grid).unwrap();
        assert_eq!(report.results.len(), 2);
        assert!(report.failures.is_empty());

        let max = report
            .results
            .iter()
            .map(|r| r.test_accuracy)
            .fold(f64::MIN, f64::max);
        assert_eq!(report.best_test_accuracy, max);

        let promoted = selector.trainer().store().load_default().unwrap();
        assert_eq!(promoted.hyperparameters, report.best_params);
        assert_eq!(promoted.metrics.test_accuracy, max);
    }

    #[test]
    fn test_failing_point_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let selector = selector(dir.path(), TrainingConfig::default());
        let grid = HyperparameterGrid {
            c: vec![-1.0, 1.0],
            gamma: vec![Gamma::Auto],
            kernel: vec![KernelKind::Rbf],
        };

        let report = selector.run(&prepared(), &grid).unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].params.c, -1.0);
        assert_eq!(report.best_params.c, 1.0);
    }

    #[test]
    fn test_all_points_failing() {
        let dir = tempfile::tempdir().unwrap();
        let selector = selector(dir.path(), TrainingConfig::default().with_point_timeout(0.0));
        let grid = HyperparameterGrid {
            c: vec![0.1, 1.0],
            gamma: vec![Gamma::Scale],
            kernel: vec![KernelKind::Rbf],
        };

        let err = selector.run(&prepared(), &grid).unwrap_err();
        assert!(matches!(err, ChurnError::GridSearchFailed(2)));
        assert!(selector.trainer().store().load_default().is_err());
    }

    #[test]
    fn test_empty_grid_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let selector = selector(dir.path(), TrainingConfig::default());
        let grid = HyperparameterGrid {
            c: vec![],
            ..HyperparameterGrid::default()
        };
        assert!(matches!(
            selector.run(&prepared(), &grid),
            Err(ChurnError::InvalidParameter { .. })
        ));
    }
}
