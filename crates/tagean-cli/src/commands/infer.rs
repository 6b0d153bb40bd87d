//! Infer command - resolve EAN codes for every block of the result log.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use console::style;
use tracing::info;

use tagean_core::catalog;
use tagean_core::config::parse_threshold;
use tagean_core::{infer_blocks, write_inference_table, DuplicatePolicy, ResultLog, Resolver};

use super::load_config;

/// Arguments for the infer command.
#[derive(Args)]
pub struct InferArgs {
    /// Result log to read
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Reference catalog CSV
    #[arg(short = 'd', long)]
    catalog: Option<PathBuf>,

    /// Inference table to write
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum fuzzy score (0-100)
    #[arg(short, long, value_parser = threshold_arg)]
    threshold: Option<u8>,

    /// How to treat repeated blocks for the same image
    #[arg(long, value_enum)]
    dedupe: Option<Dedupe>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Dedupe {
    /// Keep one row per block
    KeepAll,
    /// Keep only the last block per image
    LastWins,
}

impl From<Dedupe> for DuplicatePolicy {
    fn from(value: Dedupe) -> Self {
        match value {
            Dedupe::KeepAll => DuplicatePolicy::KeepAll,
            Dedupe::LastWins => DuplicatePolicy::LastWins,
        }
    }
}

fn threshold_arg(value: &str) -> Result<u8, String> {
    parse_threshold(value).map_err(|e| e.to_string())
}

pub async fn run(args: InferArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let log_path = args.log.unwrap_or(config.paths.results_log);
    let catalog_path = args.catalog.unwrap_or(config.paths.catalog);
    let output_path = args.output.unwrap_or(config.paths.inference_output);
    let threshold = args.threshold.unwrap_or(config.matching.fuzzy_threshold);
    let policy = args
        .dedupe
        .map(DuplicatePolicy::from)
        .unwrap_or(config.matching.duplicate_policy);

    let catalog = catalog::load(&catalog_path)?;
    println!(
        "{} Loaded {} catalog entries from {}",
        style("ℹ").blue(),
        catalog.len(),
        catalog_path.display()
    );

    let blocks = ResultLog::new(&log_path).read()?;
    info!("Read {} blocks from {}", blocks.len(), log_path.display());

    let resolver = Resolver::new(threshold).with_metric(config.matching.metric);
    let records = infer_blocks(blocks, &catalog, &resolver, policy);
    let matched = records.iter().filter(|r| r.status.is_match()).count();

    if !write_inference_table(&output_path, &records)? {
        println!(
            "{} No blocks found in {}, nothing written",
            style("!").yellow(),
            log_path.display()
        );
        return Ok(());
    }

    println!(
        "{} Wrote {} records to {} in {:?}",
        style("✓").green(),
        records.len(),
        output_path.display(),
        start.elapsed()
    );
    println!(
        "   {} matched, {} not found (fuzzy threshold {})",
        style(matched).green(),
        style(records.len() - matched).red(),
        resolver.threshold()
    );

    Ok(())
}
