//! Churn prediction server entry point

use clap::Parser;
use churn_pipeline::cli::ServerArgs;
use churn_pipeline::server::run_server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_pipeline=info,tower_http=info".into()),
        )
        .init();

    let config = ServerArgs::parse().into_config();
    run_server(config).await
}
