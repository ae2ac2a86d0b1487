//! Churn Prediction Server Module
//!
//! REST API serving the default churn model:
//! - `POST /predict` classifies one customer
//! - `GET /health` describes the loaded model

mod api;
mod error;
mod handlers;
mod request;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use request::{PredictRequest, PredictResponse, Prediction};
pub use state::PredictionService;

use crate::artifact::{DEFAULT_MODEL_NAME, MODEL_EXTENSION};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            model_path: std::env::var("CHURN_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(format!("models/{}.{}", DEFAULT_MODEL_NAME, MODEL_EXTENSION))),
            cors_origin: std::env::var("CORS_ORIGIN").ok(),
        }
    }
}

/// Load the model, then serve until ctrl+c.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    info!(model = %config.model_path.display(), "Loading model");

    let service = PredictionService::load(&config.model_path)?;
    let app = create_router(service, config.cors_origin.as_deref());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        started_at = %start_time.to_rfc3339(),
        "Churn prediction server listening"
    );

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(start_time);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received, stopping server gracefully");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
