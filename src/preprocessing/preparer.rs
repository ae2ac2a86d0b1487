//! Train/test preparation
//!
//! Turns a pair of raw customer tables into scaled feature matrices and
//! binary label vectors, fitting every piece of encoder state on the training
//! table only.

use super::encoder::{CategoryMapping, RegionEncoding};
use super::imputer::fill_mean;
use super::loader::{self, column_names};
use super::scaler::MinMaxScaler;
use super::schema::{self, LABEL_COLUMN, NUMERIC_COLUMNS, PLAN_COLUMNS, REDUNDANT_COLUMNS, REGION_COLUMN};
use super::PreprocessingConfig;
use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

const LABEL_FEATURE: &str = "churn";

/// Encoder and scaler state fitted on a training table.
///
/// Persisted inside every model artifact so inference reproduces the exact
/// transformation used at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessing {
    region_encoding: RegionEncoding,
    plan_mappings: Vec<CategoryMapping>,
    region_mapping: CategoryMapping,
    scaler: MinMaxScaler,
    feature_names: Vec<String>,
    reject_negative: bool,
}

impl FittedPreprocessing {
    /// Fit mappings and bounds on the training table.
    pub fn fit(df: &DataFrame, config: &PreprocessingConfig) -> Result<Self> {
        check_required(df)?;

        let plan_mappings = PLAN_COLUMNS
            .iter()
            .map(|c| CategoryMapping::fit(c.column, &loader::categorical_values(df, c.column)?))
            .collect::<Result<Vec<_>>>()?;

        let region_mapping =
            CategoryMapping::fit(REGION_COLUMN, &loader::categorical_values(df, REGION_COLUMN)?)?;

        if let Some(expected) = config.expected_regions {
            if region_mapping.len() != expected {
                return Err(ChurnError::DataError(format!(
                    "expected {} region categories in training table, found {}: {:?}",
                    expected,
                    region_mapping.len(),
                    region_mapping.categories()
                )));
            }
        }

        let mut fitted = Self {
            region_encoding: config.region_encoding,
            plan_mappings,
            region_mapping,
            scaler: MinMaxScaler::new(),
            feature_names: Vec::new(),
            reject_negative: config.reject_negative,
        };

        let (columns, label) = fitted.encode(df)?;
        for (name, values) in &columns {
            fitted.scaler.fit_column(name, values);
        }
        fitted.scaler.fit_column(LABEL_FEATURE, &label);
        fitted.feature_names = columns.into_iter().map(|(name, _)| name).collect();

        debug!(
            features = fitted.feature_names.len(),
            regions = fitted.region_mapping.len(),
            "Fitted preprocessing state"
        );
        Ok(fitted)
    }

    /// Apply the fitted state to a table (training or held-out).
    ///
    /// Missing numeric values are imputed from the table's own column means.
    pub fn transform(&self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        check_required(df)?;
        let (columns, label) = self.encode(df)?;

        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        if names != self.feature_names.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(ChurnError::SchemaMismatch {
                expected: self.feature_names.join(","),
                actual: names.join(","),
            });
        }

        let scaled = columns
            .iter()
            .map(|(name, values)| self.scaler.transform_column(name, values))
            .collect::<Result<Vec<_>>>()?;

        let n_rows = df.height();
        let x = Array2::from_shape_fn((n_rows, scaled.len()), |(i, j)| scaled[j][i]);

        // The label goes through the scaler like every other column. Restoring
        // it inverts the training bounds before snapping to {0, 1}, which keeps
        // a constant label column intact.
        let label_params = self.scaler.params(LABEL_FEATURE)?;
        let y: Array1<f64> = self
            .scaler
            .transform_column(LABEL_FEATURE, &label)?
            .into_iter()
            .map(|v| if label_params.invert(v) >= 0.5 { 1.0 } else { 0.0 })
            .collect();

        Ok((x, y))
    }

    /// Ordered feature names.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn plan_categories(&self, feature: &str) -> Option<&[String]> {
        PLAN_COLUMNS
            .iter()
            .position(|c| c.feature == feature)
            .map(|i| self.plan_mappings[i].categories())
    }

    /// Scale one raw (already encoded) feature value with the training bounds.
    pub fn scale_value(&self, feature: &str, raw: f64) -> Result<f64> {
        self.scaler.transform_value(feature, raw)
    }

    /// Build unscaled columns in canonical order, plus the raw label.
    fn encode(&self, df: &DataFrame) -> Result<(Vec<(String, Vec<f64>)>, Vec<f64>)> {
        let mut columns: Vec<(String, Vec<f64>)> = Vec::with_capacity(self.feature_names.len());

        for c in NUMERIC_COLUMNS.iter() {
            let raw = loader::numeric_values(df, c.column)?;
            if self.reject_negative {
                if let Some((row, v)) = raw
                    .iter()
                    .enumerate()
                    .find_map(|(i, v)| v.filter(|x| *x < 0.0).map(|x| (i, x)))
                {
                    return Err(ChurnError::DataError(format!(
                        "column '{}' has negative value {} at row {}",
                        c.column, v, row
                    )));
                }
            }
            columns.push((c.feature.to_string(), fill_mean(&raw)));
        }

        for (c, mapping) in PLAN_COLUMNS.iter().zip(&self.plan_mappings) {
            let values = loader::categorical_values(df, c.column)?;
            columns.push((c.feature.to_string(), mapping.encode_ordinal(&values)?));
        }

        let regions = loader::categorical_values(df, REGION_COLUMN)?;
        match self.region_encoding {
            RegionEncoding::OneHot => {
                let indicators = self.region_mapping.encode_onehot(&regions)?;
                for (category, values) in self.region_mapping.categories().iter().zip(indicators) {
                    columns.push((schema::region_indicator(category), values));
                }
            }
            RegionEncoding::Ordinal => {
                columns.push((
                    schema::REGION_FEATURE.to_string(),
                    self.region_mapping.encode_ordinal(&regions)?,
                ));
            }
        }

        let label = loader::label_values(df, LABEL_COLUMN)?;
        Ok((columns, label))
    }
}

/// Output of a preparation run
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: Array2<f64>,
    pub y_train: Array1<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array1<f64>,
    pub feature_names: Vec<String>,
    pub preprocessing: FittedPreprocessing,
}

impl PreparedData {
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Write the processed splits and the fitted state to `dir`.
    pub fn cache(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        write_matrix(&dir.join("X_train.csv"), &self.feature_names, &self.x_train)?;
        write_labels(&dir.join("y_train.csv"), &self.y_train)?;
        write_matrix(&dir.join("X_test.csv"), &self.feature_names, &self.x_test)?;
        write_labels(&dir.join("y_test.csv"), &self.y_test)?;

        let state = serde_json::to_string_pretty(&self.preprocessing)?;
        fs::write(dir.join("preprocessing.json"), state)?;

        info!(dir = %dir.display(), "Cached prepared splits");
        Ok(())
    }
}

/// Prepares train/test splits from raw customer tables
#[derive(Debug, Clone, Default)]
pub struct DataPreparer {
    config: PreprocessingConfig,
}

impl DataPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Load and prepare the two tables at the given paths.
    pub fn prepare(&self, train_path: &Path, test_path: &Path) -> Result<PreparedData> {
        let train = loader::load_csv(train_path)?;
        let test = loader::load_csv(test_path)?;
        self.prepare_frames(&train, &test)
    }

    /// Prepare in-memory tables.
    pub fn prepare_frames(&self, train: &DataFrame, test: &DataFrame) -> Result<PreparedData> {
        check_same_columns(train, test)?;
        warn_unknown_columns(train);

        let dropped: Vec<&str> = REDUNDANT_COLUMNS
            .iter()
            .copied()
            .filter(|c| train.column(c).is_ok())
            .collect();
        if !dropped.is_empty() {
            debug!(columns = ?dropped, "Dropping redundant charge columns");
        }

        let preprocessing = FittedPreprocessing::fit(train, &self.config)?;
        let (x_train, y_train) = preprocessing.transform(train)?;
        let (x_test, y_test) = preprocessing.transform(test)?;

        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            encoding = ?self.config.region_encoding,
            "Data preparation complete"
        );

        Ok(PreparedData {
            x_train,
            y_train,
            x_test,
            y_test,
            feature_names: preprocessing.feature_names().to_vec(),
            preprocessing,
        })
    }
}

fn check_required(df: &DataFrame) -> Result<()> {
    let present = column_names(df);
    let missing: Vec<&str> = schema::required_columns()
        .into_iter()
        .filter(|c| !present.iter().any(|p| p == c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ChurnError::DataError(format!("missing required columns: {}", missing.join(", "))))
    }
}

fn check_same_columns(train: &DataFrame, test: &DataFrame) -> Result<()> {
    let a: BTreeSet<String> = column_names(train).into_iter().collect();
    let b: BTreeSet<String> = column_names(test).into_iter().collect();
    if a == b {
        return Ok(());
    }
    let only_train: Vec<&String> = a.difference(&b).collect();
    let only_test: Vec<&String> = b.difference(&a).collect();
    Err(ChurnError::ColumnMismatch(format!(
        "only in train: {:?}, only in test: {:?}",
        only_train, only_test
    )))
}

fn warn_unknown_columns(df: &DataFrame) {
    for name in column_names(df) {
        if !schema::is_known_column(&name) {
            warn!(column = %name, "Ignoring unknown column");
        }
    }
}

fn write_matrix(path: &Path, names: &[String], x: &Array2<f64>) -> Result<()> {
    let columns: Vec<Column> = names
        .iter()
        .enumerate()
        .map(|(j, name)| Series::new(name.as_str().into(), x.column(j).to_vec()).into())
        .collect();
    let mut df = DataFrame::new(columns)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}

fn write_labels(path: &Path, y: &Array1<f64>) -> Result<()> {
    let labels: Vec<i64> = y.iter().map(|&v| v as i64).collect();
    let mut df = DataFrame::new(vec![Series::new(LABEL_COLUMN.into(), labels).into()])?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).finish(&mut df)?;
    Ok(())
}
