//! aridex CLI - desertification-risk indices

mod catalog;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use aridex_algorithms::eval::LocalEvaluator;
use aridex_algorithms::indices::PRESETS;
use aridex_cloud::blocking::RemoteEvaluatorBlocking;
use aridex_cloud::RemoteEvaluatorOptions;
use aridex_core::io::write_geotiff;

use crate::catalog::load_catalog;
use crate::config::{IndexKind, RunConfig};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "aridex")]
#[command(author, version, about = "Desertification-risk indices as raster graphs", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List index functions and their variants
    Presets,
    /// Build an index and print its graphs and tags as JSON
    Graph {
        #[arg(value_enum)]
        index: IndexKind,
        /// JSON run file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Evaluate the primary layer against a local GeoTIFF catalog
    Evaluate {
        #[arg(value_enum)]
        index: IndexKind,
        /// JSON run file
        #[arg(short, long)]
        config: PathBuf,
        /// Directory holding catalog.json and its band files
        #[arg(long)]
        catalog: PathBuf,
        /// Output GeoTIFF
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Send an index to a remote evaluator
    Submit {
        #[arg(value_enum)]
        index: IndexKind,
        /// JSON run file
        #[arg(short, long)]
        config: PathBuf,
        /// Evaluator URL
        #[arg(short, long)]
        endpoint: String,
        /// Bearer token
        #[arg(long, env = "ARIDEX_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Give up after this many seconds
        #[arg(long, default_value = "120")]
        timeout_secs: u64,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn done(name: &str, path: &Path, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Presets => {
            for (index, variant) in PRESETS {
                println!("{:<13} {}", index, variant);
            }
        }

        Commands::Graph { index, config } => {
            let run = RunConfig::load(&config)?;
            let result = run.build(index)?;
            println!("{}", result.to_json().context("Failed to serialise graph")?);
        }

        Commands::Evaluate {
            index,
            config,
            catalog,
            output,
        } => {
            let run = RunConfig::load(&config)?;
            let result = run.build(index)?;
            let layer = result.primary();
            info!(
                "{}: {} graph nodes over {}",
                layer.info.name,
                layer.graph.node_count(),
                layer.graph.datasets().join(", ")
            );

            let pb = spinner("Reading catalog...");
            let catalog = load_catalog(&catalog)?;
            pb.finish_and_clear();

            let pb = spinner("Evaluating...");
            let start = Instant::now();
            let image = LocalEvaluator::new(&catalog)
                .evaluate(&layer.graph)
                .with_context(|| format!("Failed to evaluate {}", layer.info.name))?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            let raster = image.first();
            let stats = raster.statistics();
            println!("{}", layer.info.name);
            for (key, value) in &layer.info.metadata {
                println!("  {}: {}", key, value);
            }
            println!(
                "  Valid cells: {}, masked: {}, sum: {:.4}",
                stats.valid_count, stats.masked_count, stats.sum
            );

            let pb = spinner("Writing output...");
            write_geotiff(raster, &output).context("Failed to write output")?;
            pb.finish_and_clear();
            done(&layer.info.name, &output, elapsed);
        }

        Commands::Submit {
            index,
            config,
            endpoint,
            token,
            timeout_secs,
        } => {
            let run = RunConfig::load(&config)?;
            let result = run.build(index)?;
            let options = RemoteEvaluatorOptions {
                request_timeout: Duration::from_secs(timeout_secs),
                token,
            };
            let client = RemoteEvaluatorBlocking::new(endpoint, options)
                .context("Failed to create remote evaluator")?;

            let pb = spinner("Submitting...");
            let reply = client.submit(&result);
            pb.finish_and_clear();
            let reply = reply.with_context(|| format!("Submission to {} failed", client.endpoint()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&reply).context("Failed to format reply")?
            );
        }
    }

    Ok(())
}
