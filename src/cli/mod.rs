//! Churn Pipeline CLI Module
//!
//! Command-line interface for data preparation, training and evaluation.

use clap::{ArgGroup, Parser};
use colored::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::artifact::ArtifactStore;
use crate::config::PipelineConfig;
use crate::evaluation::{Evaluation, Evaluator};
use crate::preprocessing::{loader, DataPreparer, PreparedData, RegionEncoding};
use crate::server::ServerConfig;
use crate::training::{Gamma, Hyperparameters, KernelKind, ModelSelector, Trainer};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<16} {}", muted(key), val.white());
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "churn")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer churn prediction pipeline")]
#[command(group(
    ArgGroup::new("mode")
        .args(["prepare", "train", "evaluate", "retrain"])
        .multiple(false)
))]
pub struct Cli {
    /// Prepare the data and cache the processed splits
    #[arg(long)]
    pub prepare: bool,

    /// Run the grid search and promote the best model
    #[arg(long)]
    pub train: bool,

    /// Evaluate the default model on the test split
    #[arg(long)]
    pub evaluate: bool,

    /// Retrain with fixed hyperparameters straight to the default model
    #[arg(long)]
    pub retrain: bool,

    /// Regularization strength for --retrain
    #[arg(long = "c", default_value_t = 1.0, conflicts_with_all = ["prepare", "train", "evaluate"])]
    pub c: f64,

    /// Kernel for --retrain (linear, rbf, poly, sigmoid)
    #[arg(long, default_value = "rbf", conflicts_with_all = ["prepare", "train", "evaluate"])]
    pub kernel: KernelKind,

    /// Gamma for --retrain (scale, auto or a positive number)
    #[arg(long, default_value = "scale", conflicts_with_all = ["prepare", "train", "evaluate"])]
    pub gamma: Gamma,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub train_data: Option<PathBuf>,

    #[arg(long)]
    pub test_data: Option<PathBuf>,

    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    #[arg(long)]
    pub prepared_dir: Option<PathBuf>,

    /// Region encoding (onehot, ordinal)
    #[arg(long)]
    pub region_encoding: Option<RegionEncoding>,

    /// MLflow tracking server URI
    #[arg(long)]
    pub tracking_uri: Option<String>,
}

/// What a `churn` invocation asks for
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Prepare,
    Train,
    Evaluate,
    Retrain(Hyperparameters),
}

impl Cli {
    pub fn mode(&self) -> Option<Mode> {
        if self.prepare {
            Some(Mode::Prepare)
        } else if self.train {
            Some(Mode::Train)
        } else if self.evaluate {
            Some(Mode::Evaluate)
        } else if self.retrain {
            Some(Mode::Retrain(Hyperparameters::new(self.c, self.kernel, self.gamma)))
        } else {
            None
        }
    }

    /// Defaults, then the config file, then the environment, then flags.
    pub fn resolve_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        config.apply_env()?;

        if let Some(p) = &self.train_data {
            config.train_data = p.clone();
        }
        if let Some(p) = &self.test_data {
            config.test_data = p.clone();
        }
        if let Some(p) = &self.models_dir {
            config.models_dir = p.clone();
        }
        if let Some(p) = &self.prepared_dir {
            config.prepared_dir = p.clone();
        }
        if let Some(encoding) = self.region_encoding {
            config.region_encoding = encoding;
        }
        if let Some(uri) = &self.tracking_uri {
            config.tracking.uri = uri.clone();
        }
        Ok(config)
    }
}

/// `churn-server` arguments; unset values fall back to the environment.
#[derive(Parser, Debug)]
#[command(name = "churn-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve churn predictions over HTTP")]
pub struct ServerArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Model artifact to serve
    #[arg(long)]
    pub model: Option<PathBuf>,
}

impl ServerArgs {
    pub fn into_config(self) -> ServerConfig {
        let mut config = ServerConfig::default();
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model) = self.model {
            config.model_path = model;
        }
        config
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

/// Dispatch a parsed invocation.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let Some(mode) = cli.mode() else {
        info!("No mode selected, pass --prepare, --train, --evaluate or --retrain");
        println!("  {}", muted("Nothing to do. Use --prepare, --train, --evaluate or --retrain (see --help)."));
        return Ok(());
    };

    let config = cli.resolve_config()?;
    match mode {
        Mode::Prepare => cmd_prepare(&config).map(|_| ()),
        Mode::Train => cmd_train(&config),
        Mode::Evaluate => cmd_evaluate(&config).map(|_| ()),
        Mode::Retrain(params) => cmd_retrain(&config, params),
    }
}

fn prepare(config: &PipelineConfig) -> anyhow::Result<PreparedData> {
    step_run("Loading and preparing data");
    let start = Instant::now();
    let data = DataPreparer::with_config(config.preprocessing()).prepare(&config.train_data, &config.test_data)?;
    step_done(&format!(
        "{} train × {} test rows, {} features in {:?}",
        data.x_train.nrows(),
        data.x_test.nrows(),
        data.n_features(),
        start.elapsed()
    ));
    Ok(data)
}

fn trainer(config: &PipelineConfig) -> anyhow::Result<Trainer> {
    let tracker = config.tracking.build()?;
    info!(tracker = tracker.name(), "Run tracking configured");
    Ok(Trainer::new(ArtifactStore::new(&config.models_dir), config.training()).with_tracker(tracker))
}

pub fn cmd_prepare(config: &PipelineConfig) -> anyhow::Result<PreparedData> {
    section("Prepare");
    let data = prepare(config)?;
    data.cache(&config.prepared_dir)?;
    step_ok(&format!("Prepared splits written to {}", config.prepared_dir.display()));
    println!();
    Ok(data)
}

pub fn cmd_train(config: &PipelineConfig) -> anyhow::Result<()> {
    section("Train");
    let data = prepare(config)?;

    let selector = ModelSelector::new(trainer(config)?);
    step_run(&format!("Searching {} grid points", config.grid.len()));
    let start = Instant::now();
    let report = selector.run(&data, &config.grid)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for line in report.to_string().lines() {
        println!("  {}", line);
    }
    println!();
    if !report.failures.is_empty() {
        println!("  {}", format!("{} grid point(s) failed", report.failures.len()).yellow());
    }
    kv("Best", &report.best_params.to_string());
    kv("Test accuracy", &format!("{:.4}", report.best_test_accuracy));
    kv("Saved", &report.default_path.display().to_string());
    println!();
    Ok(())
}

pub fn cmd_retrain(config: &PipelineConfig, params: Hyperparameters) -> anyhow::Result<()> {
    section("Retrain");
    let data = prepare(config)?;

    step_run(&format!("Training {}", params.to_string().cyan()));
    let outcome = ModelSelector::new(trainer(config)?).retrain(&data, params)?;
    step_done(&format!("{:?}", outcome.duration));

    println!();
    kv("Train accuracy", &format!("{:.4}", outcome.train_accuracy));
    kv("Test accuracy", &format!("{:.4}", outcome.test_accuracy));
    kv("Saved", &outcome.artifact_path.display().to_string());
    println!();
    Ok(())
}

/// Score the default model on the test table, using the preprocessing state
/// saved with the model rather than refitting it.
pub fn cmd_evaluate(config: &PipelineConfig) -> anyhow::Result<Evaluation> {
    section("Evaluate");

    step_run("Loading model");
    let artifact = ArtifactStore::new(&config.models_dir).load_default()?;
    step_done(&artifact.hyperparameters.to_string());

    step_run("Loading test data");
    let test = loader::load_csv(&config.test_data)?;
    step_done(&format!("{} rows", test.height()));

    let evaluation = Evaluator::evaluate_table(&artifact, &test)?;

    println!();
    for line in evaluation.to_string().lines() {
        println!("  {}", line);
    }
    println!();
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
        ServerArgs::command().debug_assert();
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["churn", "--prepare", "--train"]).is_err());
        let cli = Cli::try_parse_from(["churn", "--evaluate"]).unwrap();
        assert_eq!(cli.mode(), Some(Mode::Evaluate));
        assert_eq!(Cli::try_parse_from(["churn"]).unwrap().mode(), None);
    }

    #[test]
    fn test_retrain_params() {
        let cli = Cli::try_parse_from(["churn", "--retrain", "--c", "10", "--gamma", "auto"]).unwrap();
        assert_eq!(
            cli.mode(),
            Some(Mode::Retrain(Hyperparameters::new(10.0, KernelKind::Rbf, Gamma::Auto)))
        );
        assert!(Cli::try_parse_from(["churn", "--train", "--c", "10"]).is_err());
        assert!(Cli::try_parse_from(["churn", "--evaluate", "--gamma", "auto"]).is_err());
        assert!(Cli::try_parse_from(["churn", "--prepare", "--kernel", "linear"]).is_err());
    }

    #[test]
    fn test_retrain_defaults_do_not_conflict() {
        let cli = Cli::try_parse_from(["churn", "--train"]).unwrap();
        assert_eq!(cli.mode(), Some(Mode::Train));
        let cli = Cli::try_parse_from(["churn", "--retrain"]).unwrap();
        assert_eq!(cli.mode(), Some(Mode::Retrain(Hyperparameters::default())));
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "churn",
            "--prepare",
            "--models-dir",
            "/tmp/models",
            "--region-encoding",
            "ordinal",
        ])
        .unwrap();
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.region_encoding, RegionEncoding::Ordinal);
    }

    #[test]
    fn test_no_mode_is_a_no_op() {
        assert!(run(&Cli::try_parse_from(["churn"]).unwrap()).is_ok());
    }
}
