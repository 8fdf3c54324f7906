//! Calcite load test client
//!
//! Sends randomly chosen PPL or DSL queries from simulated users and writes
//! per-query latency statistics in Locust's CSV layout.

mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use calcite_perf_common::output::print_success;
use calcite_perf_common::{ClusterConfig, EnvRequirements};
use calcite_perf_loadtest::reporter::{ConsoleReporter, CsvReporter, JsonReporter, Reporter};
use calcite_perf_loadtest::{run_load_test, QuerySet, StatsCollector};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let cluster = ClusterConfig::from_env(EnvRequirements::QUERY_CLIENT)?;
    let config = args.load_test_config();

    info!("Calcite load test v{}", env!("CARGO_PKG_VERSION"));
    info!("  Endpoint: {}", cluster.endpoint);
    info!("  Log type: {}", args.log_type);
    info!("  Query type: {:?}", args.query_type);
    info!("  Users: {} (spawn rate {}/s)", config.users, config.spawn_rate);
    if cluster.credentials.is_none() {
        info!("  No credentials configured, sending unauthenticated requests");
    }
    if config.run_time.is_none() {
        warn!("Run time is 0, the test will run until Ctrl+C");
    }

    let queries = QuerySet::load(&args.queries_dir, args.log_type, args.query_type)
        .context("Failed to load queries")?;
    let queries = Arc::new(queries);
    let stats = Arc::new(StatsCollector::new()?);

    run_load_test(&cluster, queries, &config, Arc::clone(&stats)).await?;
    let snapshot = stats.snapshot();

    ConsoleReporter.report(&snapshot)?;

    let csv = CsvReporter::new(&args.csv_prefix);
    csv.report(&snapshot)
        .with_context(|| format!("Failed to write CSV reports with prefix {}", args.csv_prefix))?;
    print_success(format!("Stats written to {}", csv.stats_path().display()));
    print_success(format!("Failures written to {}", csv.failures_path().display()));

    if let Some(path) = &args.json_output {
        JsonReporter::new(path).report(&snapshot)?;
        print_success(format!("JSON report written to {}", path.display()));
    }

    Ok(())
}
