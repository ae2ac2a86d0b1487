//! Request handlers

use super::error::{Result, ServerError};
use super::request::{PredictRequest, PredictResponse};
use super::state::PredictionService;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

/// `POST /predict`
pub async fn predict(
    State(service): State<PredictionService>,
    payload: std::result::Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PredictResponse>> {
    let Json(request) = payload.map_err(|rejection| ServerError::Validation(rejection.body_text()))?;
    let prediction = service.predict(&request)?;
    debug!(prediction = prediction.label(), "Prediction served");
    Ok(Json(prediction.into()))
}

/// `GET /health`
pub async fn health(State(service): State<PredictionService>) -> Json<Value> {
    let artifact = service.artifact();
    Json(json!({
        "status": "ok",
        "model": {
            "id": artifact.id,
            "created_at": artifact.created_at.to_rfc3339(),
            "hyperparameters": artifact.hyperparameters,
            "n_features": artifact.n_features(),
            "test_accuracy": artifact.metrics.test_accuracy,
        },
    }))
}
