//! Churn Pipeline - Main Entry Point
//!
//! Runs one pipeline step: --prepare, --train, --evaluate or --retrain.

use clap::Parser;
use churn_pipeline::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "churn_pipeline=info".into()),
        )
        .init();

    let cli = Cli::parse();
    run(&cli)
}
