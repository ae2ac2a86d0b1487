//! End-to-end pipeline tests: prepare, train, evaluate

mod common;

use churn_pipeline::artifact::ArtifactStore;
use churn_pipeline::cli::{cmd_evaluate, cmd_prepare, cmd_train, run, Cli};
use churn_pipeline::error::ChurnError;
use churn_pipeline::evaluation::Evaluator;
use churn_pipeline::preprocessing::{loader, DataPreparer, RegionEncoding};
use churn_pipeline::synthetic::ChurnDataGenerator;
use churn_pipeline::tracking::TrackingBackend;
use clap::Parser;
use common::Workspace;

#[test]
fn test_prepare_train_evaluate() {
    let ws = Workspace::new(200, 60);
    let config = ws.config();

    let prepared = cmd_prepare(&config).unwrap();
    assert!(config.prepared_dir.join("X_train.csv").exists());
    assert!(config.prepared_dir.join("y_test.csv").exists());

    cmd_train(&config).unwrap();
    let store = ArtifactStore::new(&config.models_dir);
    let default = store.load_default().unwrap();
    for params in config.grid.points() {
        let variant = store.load_for(&params).unwrap();
        assert!(variant.metrics.test_accuracy <= default.metrics.test_accuracy);
    }

    let evaluation = cmd_evaluate(&config).unwrap();
    assert_eq!(evaluation.accuracy, default.metrics.test_accuracy);
    assert_eq!(evaluation, Evaluator::evaluate_prepared(&default, &prepared).unwrap());
}

#[test]
fn test_evaluate_ignores_later_changes_to_the_training_table() {
    let ws = Workspace::new(200, 60);
    let config = ws.config();
    cmd_train(&config).unwrap();
    let default = ArtifactStore::new(&config.models_dir).load_default().unwrap();

    // a different training table would fit different scaler bounds
    ChurnDataGenerator::new(40, 999).write_csv(&ws.train).unwrap();
    let refit = DataPreparer::with_config(config.preprocessing())
        .prepare(&config.train_data, &config.test_data)
        .unwrap();
    assert_ne!(refit.preprocessing, default.preprocessing);

    let evaluation = cmd_evaluate(&config).unwrap();
    assert_eq!(evaluation.accuracy, default.metrics.test_accuracy);

    let test = loader::load_csv(&config.test_data).unwrap();
    let (x_test, y_test) = default.preprocessing.transform(&test).unwrap();
    assert_eq!(evaluation, Evaluator::evaluate(&default, &x_test, &y_test).unwrap());
}

#[test]
fn test_evaluate_without_model_fails() {
    let ws = Workspace::new(40, 20);
    let err = cmd_evaluate(&ws.config()).unwrap_err();
    let err = err.downcast::<ChurnError>().unwrap();
    assert!(matches!(err, ChurnError::ModelNotFound { .. }));
}

#[test]
fn test_cli_run_reports_missing_data() {
    let ws = Workspace::new(20, 10);
    let missing = ws.dir.path().join("missing.csv");
    let cli = Cli::try_parse_from([
        "churn",
        "--prepare",
        "--train-data",
        missing.to_str().unwrap(),
        "--test-data",
        ws.test.to_str().unwrap(),
        "--prepared-dir",
        ws.dir.path().join("prepared").to_str().unwrap(),
    ])
    .unwrap();

    let err = run(&cli).unwrap_err();
    assert!(err.downcast::<ChurnError>().unwrap().is_data_error());
}

#[test]
fn test_local_tracking_through_the_pipeline() {
    let ws = Workspace::new(120, 40);
    let mut config = ws.config();
    config.tracking.backend = TrackingBackend::Local;

    cmd_train(&config).unwrap();
    let runs: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.tracking.local_dir.join("runs.json")).unwrap()).unwrap();
    assert_eq!(runs.as_array().unwrap().len(), config.grid.len());
}

#[test]
fn test_evaluating_with_other_encoding_is_schema_mismatch() {
    let ws = Workspace::new(120, 40);
    let config = ws.config();
    cmd_train(&config).unwrap();

    let mut ordinal = config.clone();
    ordinal.region_encoding = RegionEncoding::Ordinal;
    let data = DataPreparer::with_config(ordinal.preprocessing())
        .prepare(&ordinal.train_data, &ordinal.test_data)
        .unwrap();
    let artifact = ArtifactStore::new(&config.models_dir).load_default().unwrap();

    let err = Evaluator::evaluate_prepared(&artifact, &data).unwrap_err();
    assert!(matches!(err, ChurnError::SchemaMismatch { .. }));

    // the command follows the layout saved with the model, not the flag
    let evaluation = cmd_evaluate(&ordinal).unwrap();
    assert_eq!(evaluation.accuracy, artifact.metrics.test_accuracy);
}
