//! rxngraph CLI: build, score and inspect reaction knowledge graphs.
//!
//! Usage:
//!   rxngraph build <input> [--out graph.graphml] [--format graphml|json] [--report report.json]
//!   rxngraph score <graph> [--report report.json]
//!   rxngraph rules [--config engine.yaml]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rxngraph::export::{graphml, json, save_report};
use rxngraph::{EngineConfig, ExportFormat, KnowledgeGraph, Pipeline, QualityEvaluator};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "rxngraph",
    version,
    about = "Reaction knowledge graph builder and quality scorer"
)]
struct Cli {
    /// Engine configuration (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a graph from reaction-evidence records
    Build {
        /// Record file (.json or .jsonl) or directory of record files
        input: PathBuf,
        /// Output graph file
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Output format
        #[arg(long, default_value = "graphml")]
        format: ExportFormat,
        /// Also write the quality report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        /// Worker count (0 = one per core)
        #[arg(long)]
        workers: Option<usize>,
        /// Wall-clock budget in seconds
        #[arg(long)]
        budget_secs: Option<u64>,
    },
    /// Score an exported graph
    Score {
        /// GraphML or node-link JSON graph file
        graph: PathBuf,
        /// Write the quality report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// List the active classification rules
    Rules,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn load_graph(path: &Path) -> Result<KnowledgeGraph> {
    let graph = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => json::load(path),
        _ => graphml::load(path),
    };
    graph.with_context(|| format!("reading graph {}", path.display()))
}

async fn cmd_build(
    config: EngineConfig,
    input: &Path,
    out: Option<PathBuf>,
    format: ExportFormat,
    report: Option<PathBuf>,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config).context("building classifier")?;

    let token = pipeline.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing records in flight");
            token.cancel();
        }
    });

    let ingest = pipeline
        .ingest_path(input)
        .await
        .with_context(|| format!("ingesting {}", input.display()))?;
    info!(
        files = ingest.files_read,
        unreadable = ingest.files_failed,
        malformed = ingest.malformed_records,
        "input loaded"
    );
    info!("{}", pipeline.stats());

    let out = out.unwrap_or_else(|| PathBuf::from(format!("reaction_graph.{}", format.extension())));
    let graph = pipeline
        .export(&out, format)
        .with_context(|| format!("writing graph to {}", out.display()))?;

    let quality = QualityEvaluator::new(pipeline.config().quality.clone()).score(&graph);
    println!("{}", quality);
    if let Some(path) = report {
        save_report(&quality, &path).with_context(|| format!("writing report to {}", path.display()))?;
    }

    if !ingest.outcome.is_complete() {
        bail!(
            "stopped early: {} of {} records not ingested",
            ingest.outcome.not_submitted,
            ingest.outcome.total
        );
    }
    Ok(())
}

fn cmd_score(config: &EngineConfig, graph_path: &Path, report: Option<PathBuf>) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let quality = QualityEvaluator::new(config.quality.clone()).score(&graph);
    println!("{}", quality);
    if let Some(path) = report {
        save_report(&quality, &path).with_context(|| format!("writing report to {}", path.display()))?;
    }
    Ok(())
}

fn cmd_rules(config: &EngineConfig) -> Result<()> {
    let classifier = config.build_classifier().context("building classifier")?;
    println!("{:>8}  {:<32}  {:<10}  PATTERN", "PRIORITY", "LABEL", "APPLIES");
    for rule in classifier.rules() {
        let applies: Vec<&str> = rule.applies_to.iter().map(|k| k.as_str()).collect();
        println!(
            "{:>8}  {:<32}  {:<10}  {}",
            rule.priority,
            rule.label,
            applies.join(","),
            rule.source
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Build {
            input,
            out,
            format,
            report,
            workers,
            budget_secs,
        } => {
            if let Some(workers) = workers {
                config.batch.workers = workers;
            }
            if budget_secs.is_some() {
                config.batch.budget_secs = budget_secs;
            }
            cmd_build(config, &input, out, format, report).await
        }
        Commands::Score { graph, report } => cmd_score(&config, &graph, report),
        Commands::Rules => cmd_rules(&config),
    }
}
