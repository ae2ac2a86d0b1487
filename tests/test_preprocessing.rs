//! Integration tests for data preparation

mod common;

use churn_pipeline::error::ChurnError;
use churn_pipeline::preprocessing::{DataPreparer, PreprocessingConfig, RegionEncoding};
use churn_pipeline::synthetic::ChurnDataGenerator;
use common::{frames, Workspace};

// ============================================================================
// Layout
// ============================================================================

#[test]
fn test_train_and_test_share_schema() {
    let ws = Workspace::new(150, 50);
    let data = DataPreparer::new().prepare(&ws.train, &ws.test).unwrap();

    assert_eq!(data.x_train.ncols(), data.x_test.ncols());
    assert_eq!(data.feature_names.len(), 20);
    assert_eq!(data.feature_names, data.preprocessing.feature_names());
    assert_eq!(data.feature_names[0], "account_length");
    assert_eq!(data.feature_names[10], "customer_service_calls");
    assert_eq!(data.feature_names[11], "international_plan");
    assert_eq!(data.feature_names[13], "state_0");
    assert_eq!(data.feature_names[19], "state_6");
}

#[test]
fn test_labels_are_binary() {
    let ws = Workspace::new(150, 50);
    let data = DataPreparer::new().prepare(&ws.train, &ws.test).unwrap();
    assert!(data.y_train.iter().chain(data.y_test.iter()).all(|&y| y == 0.0 || y == 1.0));
    assert!(data.y_train.iter().any(|&y| y == 1.0));
    assert!(data.y_train.iter().any(|&y| y == 0.0));
}

#[test]
fn test_features_scaled_to_unit_range_on_train() {
    let (train, test) = frames(150, 50);
    let data = DataPreparer::new().prepare_frames(&train, &test).unwrap();
    assert!(data.x_train.iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn test_preparation_is_deterministic() {
    let ws = Workspace::new(120, 40);
    let preparer = DataPreparer::new();
    let a = preparer.prepare(&ws.train, &ws.test).unwrap();
    let b = preparer.prepare(&ws.train, &ws.test).unwrap();

    assert_eq!(a.feature_names, b.feature_names);
    assert_eq!(a.x_train, b.x_train);
    assert_eq!(a.x_test, b.x_test);
    assert_eq!(a.y_train, b.y_train);
}

#[test]
fn test_ordinal_region_layout() {
    let (train, test) = frames(100, 30);
    let config = PreprocessingConfig::default().with_region_encoding(RegionEncoding::Ordinal);
    let data = DataPreparer::with_config(config).prepare_frames(&train, &test).unwrap();

    assert_eq!(data.n_features(), 14);
    assert_eq!(data.feature_names.last().map(String::as_str), Some("state"));
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_missing_values_are_imputed() {
    let train = ChurnDataGenerator::new(150, 1).with_missing_rate(0.1).generate().unwrap();
    let test = ChurnDataGenerator::new(50, 2).with_missing_rate(0.1).generate().unwrap();
    let data = DataPreparer::new().prepare_frames(&train, &test).unwrap();

    assert!(data.x_train.iter().all(|v| v.is_finite()));
    assert!(data.x_test.iter().all(|v| v.is_finite()));
}

#[test]
fn test_unseen_test_region_fails() {
    let train = ChurnDataGenerator::new(100, 1).generate().unwrap();
    let test = ChurnDataGenerator::new(40, 2).with_regions(9).generate().unwrap();

    let err = DataPreparer::new().prepare_frames(&train, &test).unwrap_err();
    assert!(matches!(err, ChurnError::EncodingError { .. }));
    assert!(err.is_data_error());
}

#[test]
fn test_missing_file_is_data_error() {
    let ws = Workspace::new(20, 10);
    let err = DataPreparer::new()
        .prepare(&ws.dir.path().join("nope.csv"), &ws.test)
        .unwrap_err();
    assert!(err.is_data_error());
}

#[test]
fn test_column_mismatch() {
    let (train, test) = frames(50, 20);
    let test = test.drop("Total day charge").unwrap();
    let err = DataPreparer::new().prepare_frames(&train, &test).unwrap_err();
    assert!(matches!(err, ChurnError::ColumnMismatch(_)));
}

#[test]
fn test_expected_regions_check() {
    let (train, test) = frames(60, 20);
    let config = PreprocessingConfig::default().with_expected_regions(5);
    let err = DataPreparer::with_config(config).prepare_frames(&train, &test).unwrap_err();
    assert!(err.is_data_error());
}

// ============================================================================
// Cache
// ============================================================================

#[test]
fn test_cache_writes_splits() {
    let ws = Workspace::new(60, 20);
    let data = DataPreparer::new().prepare(&ws.train, &ws.test).unwrap();
    let out = ws.dir.path().join("prepared");
    data.cache(&out).unwrap();

    for file in ["X_train.csv", "y_train.csv", "X_test.csv", "y_test.csv", "preprocessing.json"] {
        assert!(out.join(file).exists(), "{} missing", file);
    }
}
