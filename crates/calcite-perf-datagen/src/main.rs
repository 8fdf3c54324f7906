//! Calcite performance data generator
//!
//! Fills an OpenSearch index with synthetic VPC, Network Firewall,
//! CloudTrail or WAF logs, or ingests a pre-built NDJSON corpus.

mod cli;

use anyhow::{Context, Result};
use calcite_perf_common::format::format_number;
use calcite_perf_common::{ClusterConfig, EnvRequirements, LogType};
use calcite_perf_datagen::ingest::{ingest_file, is_ndjson_path, IngestOptions};
use calcite_perf_datagen::{
    generator_for, run_generation, BulkClient, BulkClientConfig, GenerationPlan,
};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{Cli, Command, GenerateArgs, IngestArgs};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Vpc(args) => generate(LogType::Vpc, args).await,
        Command::Nfw(args) => generate(LogType::Nfw, args).await,
        Command::Cloudtrail(args) => generate(LogType::Cloudtrail, args).await,
        Command::Waf(args) => generate(LogType::Waf, args).await,
        Command::Ingest(args) => ingest(args).await,
    }
}

async fn generate(log_type: LogType, args: GenerateArgs) -> Result<()> {
    let generator = generator_for(log_type)?;
    let profile = generator.profile();

    // Validated before any client exists.
    let cluster = ClusterConfig::from_env(profile.env)?;
    let index = cluster.index()?.to_string();

    let mut plan = GenerationPlan::for_profile(&profile, index, args.target_docs);
    if let Some(batch_size) = args.batch_size {
        plan.batch_size = batch_size;
    }
    if let Some(workers) = args.workers {
        plan.workers = workers;
    }
    if let Some(threshold) = args.max_consecutive_failures {
        plan.max_consecutive_failures = threshold;
    }
    if let Some(delay) = args.batch_delay {
        plan.batch_delay = delay;
    }
    plan.skip_connection_test = args.skip_connection_test;
    plan.show_progress = !args.no_progress;

    if plan.batch_size == 0 {
        anyhow::bail!("Batch size must be > 0");
    }
    if plan.workers == 0 {
        anyhow::bail!("Workers must be > 0");
    }

    info!("{} generator v{}", log_type.description(), env!("CARGO_PKG_VERSION"));
    info!("  Endpoint: {}", cluster.endpoint);
    info!("  Index: {}", plan.index);

    let summary = run_generation(&cluster, generator, &plan)
        .await
        .with_context(|| format!("{log_type} generation failed"))?;

    println!();
    println!("Total documents: {}", format_number(summary.indexed));
    println!("Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!("Rate: {:.0} docs/sec", summary.docs_per_sec());
    println!("Failed batches: {}", summary.failed_batches);
    if summary.workers_stopped_early > 0 {
        println!("Workers stopped early: {}", summary.workers_stopped_early);
    }
    if let Some(count) = summary.index_count {
        println!("Index count: {}", format_number(count));
    }

    Ok(())
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let cluster = ClusterConfig::from_env(EnvRequirements::OPTIONAL_AUTH_INGEST)?;
    let index = cluster.index()?.to_string();

    if !is_ndjson_path(&args.file) {
        warn!(
            "{} does not have a .json/.ndjson/.jsonl extension, reading it as JSON lines anyway",
            args.file.display()
        );
    }

    let mut config = BulkClientConfig::from(&cluster);
    config.accept_invalid_certs = args.insecure;
    let client = BulkClient::new(config)?;

    let mut options = IngestOptions::new(args.file.clone(), index);
    options.batch_size = args.batch_size.max(1);
    options.batch_delay = args.batch_delay;
    options.timestamp = args.timestamp;

    let summary = ingest_file(&client, &options)
        .await
        .with_context(|| format!("Failed to ingest {}", args.file.display()))?;

    println!();
    println!("Ingestion complete:");
    println!("Total documents processed: {}", format_number(summary.processed));
    println!("Successfully ingested: {}", format_number(summary.ingested));
    println!("Failed: {}", format_number(summary.failed()));
    println!("Invalid lines skipped: {}", format_number(summary.invalid_lines));
    println!("Total batches: {}", summary.batches);
    if let Some(count) = summary.index_count {
        println!("Final index count: {} documents", format_number(count));
    }

    Ok(())
}
