//! reportkeeper cli
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use reportkeeper_core::app::AppBuilder;
use reportkeeper_core::config::AppConfig;
use reportkeeper_core::domain::{NewReport, Page, ReportId};
use reportkeeper_core::ports::MetricsSource;
use tracing_subscriber::EnvFilter;

/// Cli
#[derive(Debug, Parser)]
#[command(name = "reportkeeper", about = "Report history and retention cli.", version)]
struct Cli {
    /// Path of the TOML config file (defaults are used when it does not exist)
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one retention sweep
    Sweep(RetentionOpts),
    /// Run retention sweeps periodically until Ctrl-C
    Watch(WatchOpts),
    /// List report history, newest first
    List(ListOpts),
    /// Show one report
    #[command(arg_required_else_help = true)]
    Show { id: ReportId },
    /// Delete one report and its file
    #[command(arg_required_else_help = true)]
    Delete { id: ReportId },
    /// Record a generated report from a JSON file
    #[command(arg_required_else_help = true)]
    Record {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run an instant query against the metrics backend
    #[command(arg_required_else_help = true)]
    Query { promql: String },
}

#[derive(Debug, Args)]
struct RetentionOpts {
    /// Override retention.max_age_days
    #[arg(long)]
    max_age_days: Option<u32>,
}

#[derive(Debug, Args)]
struct WatchOpts {
    #[command(flatten)]
    retention: RetentionOpts,

    /// Override retention.interval_secs
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[derive(Debug, Args)]
struct ListOpts {
    #[arg(long, default_value_t = Page::DEFAULT_LIMIT)]
    limit: u32,
    #[arg(long, default_value_t = 0)]
    offset: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reportkeeper=info".parse()?))
        .init();

    let args = Cli::parse();
    let config = AppConfig::load_or_default(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    match args.command {
        Commands::Sweep(opts) => {
            let app = AppBuilder::new(config)
                .max_age_days(opts.max_age_days)
                .build()?;
            let report = app.sweeper.sweep_once().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Watch(opts) => {
            let app = AppBuilder::new(config)
                .max_age_days(opts.retention.max_age_days)
                .interval_secs(opts.interval_secs)
                .build()?;
            let handle = app.retention_loop().spawn();
            tracing::info!(
                max_age_days = app.config.retention.max_age_days,
                interval_secs = app.config.retention.interval_secs,
                "retention watch started, press Ctrl-C to stop"
            );
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            let sweeps = handle.shutdown_and_join().await?;
            println!("stopped after {sweeps} sweeps");
        }
        Commands::List(opts) => {
            let app = AppBuilder::new(config).build()?;
            for record in app.history.list(Page::new(opts.limit, opts.offset)).await? {
                println!("{}", serde_json::to_string(&record)?);
            }
        }
        Commands::Show { id } => {
            let app = AppBuilder::new(config).build()?;
            let record = app.history.get(id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Delete { id } => {
            let app = AppBuilder::new(config).build()?;
            app.history.delete(id).await?;
            println!("deleted {id}");
        }
        Commands::Record { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let report: NewReport = serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            let app = AppBuilder::new(config).build()?;
            let id = app.history.record(report).await?;
            println!("recorded {id}");
        }
        Commands::Query { promql } => {
            let app = AppBuilder::new(config).build()?;
            let client = app.metrics_client()?;
            for sample in client.query(&promql, None).await? {
                println!("{}", serde_json::to_string(&sample)?);
            }
        }
    }
    Ok(())
}
