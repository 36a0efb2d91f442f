//! # Prototyper
//!
//! Generates a UI prototype from a DBML file and prints the stored artifact as
//! JSON.

use anyhow::{bail, Context};
use clap::Parser;
use prototyper_core::config::ConfigLoader;
use prototyper_core::logging::init_structured_logging;
use prototyper_core::orchestration::{GenerationOptions, GenerationPreferences, SubagentConfig};
use prototyper_core::{PrototypePipeline, PrototyperError, ViewKind};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "prototyper")]
#[command(about = "Generate a UI prototype from a DBML schema")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// DBML schema file
    schema: PathBuf,

    /// Prototype name (defaults to the file stem)
    #[arg(short, long)]
    name: Option<String>,

    /// Prototype description
    #[arg(short, long)]
    description: Option<String>,

    /// Comma-separated view kinds to generate (list,detail,form,dashboard,master-detail)
    #[arg(long, value_delimiter = ',')]
    views: Vec<ViewKind>,

    /// Override the scheduler concurrency cap
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Configuration file (default: config/prototyper.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_path(path),
        None => ConfigLoader::load(),
    }
    .context("failed to load configuration")?;

    let dbml = std::fs::read_to_string(&cli.schema)
        .with_context(|| format!("failed to read {}", cli.schema.display()))?;
    let name = cli.name.clone().unwrap_or_else(|| {
        cli.schema
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prototype".to_string())
    });

    let mut options = GenerationOptions::new(dbml, name).with_preferences(GenerationPreferences {
        include_views: (!cli.views.is_empty()).then(|| cli.views.clone()),
        ..Default::default()
    });
    if let Some(description) = cli.description.clone() {
        options = options.with_description(description);
    }
    if cli.max_concurrency.is_some() {
        options = options.with_subagent_config(SubagentConfig {
            max_concurrency: cli.max_concurrency,
            ..Default::default()
        });
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            ctrl_c.cancel();
        }
    });

    let pipeline = PrototypePipeline::with_defaults(config)?;
    let outcome = match pipeline.generate(options, &cancel).await {
        Ok(outcome) => outcome,
        Err(PrototyperError::Validation(issues)) => {
            for issue in &issues {
                error!(%issue, "Schema validation error");
            }
            bail!("schema is invalid ({} error(s))", issues.len());
        }
        Err(e) => return Err(e.into()),
    };

    let stats = &outcome.artifact.configuration.custom.stats;
    info!(
        id = %outcome.stored.id,
        successful = stats.successful,
        failed = stats.failed,
        "Prototype stored"
    );
    println!("{}", serde_json::to_string_pretty(&outcome.stored)?);
    Ok(())
}
