//! Shared fixtures for integration tests

#![allow(dead_code)]

use churn_pipeline::config::PipelineConfig;
use churn_pipeline::preprocessing::schema::{NUMERIC_COLUMNS, REGION_COLUMN};
use churn_pipeline::preprocessing::{DataPreparer, PreparedData};
use churn_pipeline::server::PredictRequest;
use churn_pipeline::synthetic::ChurnDataGenerator;
use churn_pipeline::tracking::TrackingBackend;
use churn_pipeline::training::{Gamma, HyperparameterGrid, KernelKind};
use polars::prelude::*;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tempfile::TempDir;

pub const TRAIN_SEED: u64 = 80;
pub const TEST_SEED: u64 = 20;

/// Scratch directory holding a train/test CSV pair
pub struct Workspace {
    pub dir: TempDir,
    pub train: PathBuf,
    pub test: PathBuf,
}

impl Workspace {
    pub fn new(n_train: usize, n_test: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let train = dir.path().join("churn_80.csv");
        let test = dir.path().join("churn_20.csv");
        ChurnDataGenerator::new(n_train, TRAIN_SEED).write_csv(&train).unwrap();
        ChurnDataGenerator::new(n_test, TEST_SEED).write_csv(&test).unwrap();
        Self { dir, train, test }
    }

    /// Config pointing at this workspace, with tracking off and a two-point grid.
    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig {
            train_data: self.train.clone(),
            test_data: self.test.clone(),
            models_dir: self.dir.path().join("models"),
            prepared_dir: self.dir.path().join("prepared"),
            grid: small_grid(),
            ..PipelineConfig::default()
        };
        config.tracking.backend = TrackingBackend::None;
        config.tracking.local_dir = self.dir.path().join("runs");
        config
    }
}

pub fn small_grid() -> HyperparameterGrid {
    HyperparameterGrid {
        c: vec![1.0, 10.0],
        gamma: vec![Gamma::Scale],
        kernel: vec![KernelKind::Rbf],
    }
}

pub fn frames(n_train: usize, n_test: usize) -> (DataFrame, DataFrame) {
    (
        ChurnDataGenerator::new(n_train, TRAIN_SEED).generate().unwrap(),
        ChurnDataGenerator::new(n_test, TEST_SEED).generate().unwrap(),
    )
}

pub fn prepared(n_train: usize, n_test: usize) -> PreparedData {
    let (train, test) = frames(n_train, n_test);
    DataPreparer::new().prepare_frames(&train, &test).unwrap()
}

fn cell_f64(df: &DataFrame, column: &str, row: usize) -> f64 {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .get(row)
        .unwrap()
}

fn cell_str(df: &DataFrame, column: &str, row: usize) -> String {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .get(row)
        .unwrap()
        .to_string()
}

/// Request body reproducing one raw customer row.
pub fn request_body_for_row(df: &DataFrame, row: usize) -> Value {
    let mut body = Map::new();
    for c in NUMERIC_COLUMNS.iter() {
        let v = cell_f64(df, c.column, row);
        let value = if c.feature.ends_with("_minutes") {
            json!(v)
        } else {
            json!(v as u32)
        };
        body.insert(c.feature.to_string(), value);
    }
    for (column, field) in [("International plan", "international_plan"), ("Voice mail plan", "voice_mail_plan")] {
        let flag = u8::from(cell_str(df, column, row) == "Yes");
        body.insert(field.to_string(), json!(flag));
    }
    let region = cell_str(df, REGION_COLUMN, row);
    for k in 0..7 {
        body.insert(format!("state_{}", k), json!(u8::from(region == k.to_string())));
    }
    Value::Object(body)
}

pub fn request_for_row(df: &DataFrame, row: usize) -> PredictRequest {
    serde_json::from_value(request_body_for_row(df, row)).unwrap()
}

/// A customer with many service calls on the international plan.
pub fn unhappy_customer() -> Value {
    json!({
        "account_length": 120,
        "number_vmail_messages": 0,
        "total_day_minutes": 250.0,
        "total_day_calls": 100,
        "total_eve_minutes": 200.0,
        "total_eve_calls": 100,
        "total_night_minutes": 200.0,
        "total_night_calls": 100,
        "total_intl_minutes": 10.0,
        "total_intl_calls": 4,
        "customer_service_calls": 7,
        "international_plan": 1,
        "voice_mail_plan": 0,
        "state_0": 1,
        "state_1": 0,
        "state_2": 0,
        "state_3": 0,
        "state_4": 0,
        "state_5": 0,
        "state_6": 0
    })
}

/// A low-usage customer with no service calls and no plans.
pub fn happy_customer() -> Value {
    let mut body = unhappy_customer();
    body["customer_service_calls"] = json!(0);
    body["international_plan"] = json!(0);
    body["total_day_minutes"] = json!(150.0);
    body
}
