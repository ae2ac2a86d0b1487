//! Integration tests: prediction service and HTTP API

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use churn_pipeline::artifact::{ArtifactStore, ModelArtifact};
use churn_pipeline::error::ChurnError;
use churn_pipeline::preprocessing::{DataPreparer, PreprocessingConfig, RegionEncoding};
use churn_pipeline::server::{create_router, run_server, PredictionService, ServerConfig};
use churn_pipeline::training::{Gamma, Hyperparameters, KernelKind, Trainer, TrainingConfig};
use common::{frames, happy_customer, request_body_for_row, request_for_row, unhappy_customer};
use polars::prelude::{NamedFrom, Series};
use serde_json::{json, Value};
use tower::ServiceExt;

fn trained(encoding: RegionEncoding) -> ModelArtifact {
    let (train, test) = frames(300, 100);
    let config = PreprocessingConfig::default().with_region_encoding(encoding);
    let data = DataPreparer::with_config(config).prepare_frames(&train, &test).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let trainer = Trainer::new(ArtifactStore::new(dir.path()), TrainingConfig::default());
    trainer
        .fit(&data, Hyperparameters::new(10.0, KernelKind::Rbf, Gamma::Scale))
        .unwrap()
        .0
}

fn app() -> axum::Router {
    create_router(PredictionService::new(trained(RegionEncoding::OneHot)).unwrap(), None)
}

async fn post_predict(app: axum::Router, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// ============================================================================
// Service
// ============================================================================

#[test]
fn test_request_matches_training_prediction() {
    let (train, test) = frames(300, 100);
    let data = DataPreparer::new().prepare_frames(&train, &test).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let trainer = Trainer::new(ArtifactStore::new(dir.path()), TrainingConfig::default());
    let artifact = trainer.fit(&data, Hyperparameters::default()).unwrap().0;

    let expected = artifact.predict(&data.x_train).unwrap();
    let service = PredictionService::new(artifact).unwrap();

    for row in 0..25 {
        let request = request_for_row(&train, row);
        let assembled = service.assemble(&request).unwrap();
        for (a, b) in assembled.row(0).iter().zip(data.x_train.row(row).iter()) {
            assert!((a - b).abs() < 1e-12, "row {}: {} vs {}", row, a, b);
        }
        let class = if expected[row] >= 0.5 { 1.0 } else { 0.0 };
        assert_eq!(
            service.predict(&request).unwrap(),
            churn_pipeline::server::Prediction::from_class(class)
        );
    }
}

#[test]
fn test_ordinal_artifact_is_not_servable() {
    let err = PredictionService::new(trained(RegionEncoding::Ordinal)).unwrap_err();
    assert!(matches!(err, ChurnError::SchemaMismatch { .. }));
}

#[test]
fn test_plan_flag_without_no_category_is_not_servable() {
    let (mut train, _) = frames(150, 50);
    let n = train.height();
    train
        .with_column(Series::new("International plan".into(), vec!["Yes"; n]))
        .unwrap();
    let data = DataPreparer::new().prepare_frames(&train, &train).unwrap();
    assert_eq!(
        data.preprocessing.plan_categories("international_plan"),
        Some(&["Yes".to_string()][..])
    );

    let dir = tempfile::tempdir().unwrap();
    let trainer = Trainer::new(ArtifactStore::new(dir.path()), TrainingConfig::default());
    let artifact = trainer.fit(&data, Hyperparameters::default()).unwrap().0;

    let err = PredictionService::new(artifact).unwrap_err();
    assert!(matches!(err, ChurnError::SchemaMismatch { .. }));
}

#[tokio::test]
async fn test_server_refuses_to_start_without_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        model_path: dir.path().join("churn_model.bin"),
        cors_origin: None,
    };
    let err = run_server(config).await.unwrap_err();
    assert!(matches!(
        err.downcast::<ChurnError>().unwrap(),
        ChurnError::ModelNotFound { .. }
    ));
}

// ============================================================================
// HTTP API
// ============================================================================

#[tokio::test]
async fn test_predict_high_service_calls_churns() {
    let (status, body) = post_predict(app(), unhappy_customer().to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"prediction": "Customer Will Churn"}));
}

#[tokio::test]
async fn test_predict_happy_customer_stays() {
    let (status, body) = post_predict(app(), happy_customer().to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "Customer Will Not Churn");
}

#[tokio::test]
async fn test_training_row_over_http() {
    let (train, _) = frames(300, 100);
    let (status, body) = post_predict(app(), request_body_for_row(&train, 3).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["prediction"].as_str().unwrap().starts_with("Customer Will"));
}

#[tokio::test]
async fn test_malformed_requests_are_client_errors() {
    let mut missing = unhappy_customer();
    missing.as_object_mut().unwrap().remove("state_6");

    let mut unknown = unhappy_customer();
    unknown["state_7"] = json!(0);

    let mut wrong_type = unhappy_customer();
    wrong_type["total_day_calls"] = json!("many");

    let mut negative_minutes = unhappy_customer();
    negative_minutes["total_night_minutes"] = json!(-5.0);

    let mut bad_flag = unhappy_customer();
    bad_flag["voice_mail_plan"] = json!(3);

    let bodies = [
        missing.to_string(),
        unknown.to_string(),
        wrong_type.to_string(),
        negative_minutes.to_string(),
        bad_flag.to_string(),
        "{not json".to_string(),
        String::new(),
    ];

    let app = app();
    for body in bodies {
        let (status, response) = post_predict(app.clone(), body.clone()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {}", body);
        assert_eq!(response["error"], true);
        assert!(response["message"].is_string());
    }

    // the service keeps working afterwards
    let (status, _) = post_predict(app, unhappy_customer().to_string()).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_describes_model() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"]["n_features"], 20);
    assert_eq!(body["model"]["hyperparameters"]["kernel"], "rbf");
    assert_eq!(body["model"]["hyperparameters"]["gamma"], "scale");
}

#[tokio::test]
async fn test_unknown_route_and_method() {
    let response = app()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app()
        .oneshot(Request::builder().uri("/predict").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}
