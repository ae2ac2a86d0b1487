//! MLflow REST client

use super::{RunRecord, RunTracker};
use crate::error::{ChurnError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Reports runs to an MLflow tracking server (REST API 2.0)
pub struct MlflowTracker {
    client: Client,
    base_url: String,
    experiment_id: String,
}

#[derive(Serialize)]
struct Param {
    key: String,
    value: String,
}

#[derive(Serialize)]
struct Metric {
    key: String,
    value: f64,
    timestamp: i64,
    step: i64,
}

#[derive(Deserialize)]
struct CreateRunResponse {
    run: RunEnvelope,
}

#[derive(Deserialize)]
struct RunEnvelope {
    info: RunInfo,
}

#[derive(Deserialize)]
struct RunInfo {
    run_id: String,
}

impl MlflowTracker {
    pub fn new(uri: &str, experiment_id: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ChurnError::Tracking(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: uri.trim_end_matches('/').to_string(),
            experiment_id: experiment_id.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::blocking::Response> {
        self.client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| ChurnError::Tracking(format!("{} failed: {}", path, e)))
    }

    fn set_status(&self, run_id: &str, status: &str, end_time: i64) -> Result<()> {
        self.post(
            "runs/update",
            &json!({
                "run_id": run_id,
                "status": status,
                "end_time": end_time,
            }),
        )?;
        Ok(())
    }

    fn batch_body(run_id: &str, record: &RunRecord) -> serde_json::Value {
        let timestamp = record.finished_at.timestamp_millis();
        let params = [
            ("C", format!("{:?}", record.hyperparameters.c)),
            ("kernel", record.hyperparameters.kernel.to_string()),
            ("gamma", record.hyperparameters.gamma.to_string()),
            ("artifact", record.artifact.clone()),
        ]
        .into_iter()
        .map(|(key, value)| Param { key: key.to_string(), value })
        .collect::<Vec<_>>();

        let metrics = [
            ("train_accuracy", record.train_accuracy),
            ("test_accuracy", record.test_accuracy),
        ]
        .into_iter()
        .map(|(key, value)| Metric { key: key.to_string(), value, timestamp, step: 0 })
        .collect::<Vec<_>>();

        json!({
            "run_id": run_id,
            "params": params,
            "metrics": metrics,
        })
    }
}

impl RunTracker for MlflowTracker {
    fn log_run(&self, record: &RunRecord) -> Result<()> {
        let created: CreateRunResponse = self
            .post(
                "runs/create",
                &json!({
                    "experiment_id": self.experiment_id,
                    "start_time": record.started_at.timestamp_millis(),
                    "run_name": record.hyperparameters.artifact_stem(),
                }),
            )?
            .json()
            .map_err(|e| ChurnError::Tracking(format!("invalid runs/create response: {}", e)))?;
        let run_id = created.run.info.run_id;
        let end_time = record.finished_at.timestamp_millis();

        if let Err(e) = self.post("runs/log-batch", &Self::batch_body(&run_id, record)) {
            // Best effort: do not leave the run RUNNING on the server.
            if let Err(update) = self.set_status(&run_id, "FAILED", end_time) {
                debug!(run_id = %run_id, error = %update, "Could not mark run as failed");
            }
            return Err(e);
        }
        self.set_status(&run_id, "FINISHED", end_time)?;

        debug!(run_id = %run_id, "Run logged to MLflow");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mlflow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::Hyperparameters;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::{mpsc, Arc, Mutex};

    fn record() -> RunRecord {
        let now = Utc::now();
        RunRecord {
            run_id: "r1".to_string(),
            hyperparameters: Hyperparameters::default(),
            train_accuracy: 0.9,
            test_accuracy: 0.8,
            artifact: "models/churn_model_C1.0_kernelrbf_gammascale.bin".to_string(),
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_batch_body_layout() {
        let body = MlflowTracker::batch_body("abc", &record());
        assert_eq!(body["run_id"], "abc");
        assert_eq!(body["params"][0]["key"], "C");
        assert_eq!(body["params"][0]["value"], "1.0");
        assert_eq!(body["params"][2]["value"], "scale");
        assert_eq!(body["metrics"][1]["key"], "test_accuracy");
        assert_eq!(body["metrics"][1]["value"], 0.8);
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let tracker = MlflowTracker::new("http://localhost:5000/", "0", Duration::from_secs(1)).unwrap();
        assert_eq!(tracker.endpoint("runs/create"), "http://localhost:5000/api/2.0/mlflow/runs/create");
    }

    #[test]
    fn test_unreachable_server_is_tracking_error() {
        let tracker = MlflowTracker::new("http://127.0.0.1:9", "0", Duration::from_millis(300)).unwrap();
        let err = tracker.log_run(&record()).unwrap_err();
        assert!(matches!(err, ChurnError::Tracking(_)));
    }

    /// MLflow stand-in on a background runtime. Returns its URI and the
    /// statuses received by `runs/update`.
    fn mock_mlflow(batch_status: StatusCode) -> (String, Arc<Mutex<Vec<String>>>) {
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let recorded = statuses.clone();
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(async move {
                let app = Router::new()
                    .route(
                        "/api/2.0/mlflow/runs/create",
                        post(|| async { Json(json!({"run": {"info": {"run_id": "run-1"}}})) }),
                    )
                    .route("/api/2.0/mlflow/runs/log-batch", post(move || async move { batch_status }))
                    .route(
                        "/api/2.0/mlflow/runs/update",
                        post(move |Json(body): Json<Value>| async move {
                            let status = body["status"].as_str().unwrap_or_default().to_string();
                            recorded.lock().unwrap().push(status);
                            Json(json!({}))
                        }),
                    );
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send(listener.local_addr().unwrap()).unwrap();
                axum::serve(listener, app).await.unwrap();
            });
        });

        let addr = rx.recv().unwrap();
        (format!("http://{}", addr), statuses)
    }

    #[test]
    fn test_run_marked_finished() {
        let (uri, statuses) = mock_mlflow(StatusCode::OK);
        let tracker = MlflowTracker::new(&uri, "0", Duration::from_secs(5)).unwrap();

        tracker.log_run(&record()).unwrap();
        assert_eq!(*statuses.lock().unwrap(), vec!["FINISHED".to_string()]);
    }

    #[test]
    fn test_failed_batch_marks_run_failed() {
        let (uri, statuses) = mock_mlflow(StatusCode::INTERNAL_SERVER_ERROR);
        let tracker = MlflowTracker::new(&uri, "0", Duration::from_secs(5)).unwrap();

        let err = tracker.log_run(&record()).unwrap_err();
        assert!(matches!(err, ChurnError::Tracking(_)));
        assert_eq!(*statuses.lock().unwrap(), vec!["FAILED".to_string()]);
    }
}
