//! Render comparison charts
//!
//! Reads the table written by `calcite-compare` and writes one PNG per chart.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use calcite_perf_common::output::{print_header, print_success};
use calcite_perf_report::read_comparison;
use calcite_perf_report::visualize::{default_output_dir, render_all};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "calcite-visualize",
    about = "Render charts from a Calcite vs Non-Calcite comparison table",
    version
)]
struct Args {
    /// Comparison CSV written by calcite-compare
    #[arg(
        default_value = "performance_results/cloudtrail/calcite_vs_non_calcite_comparison_cloudtrail.csv"
    )]
    input: PathBuf,

    /// Chart directory (default: `visualizations/` next to the input)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    if !args.input.is_file() {
        bail!("File not found: {}", args.input.display());
    }

    let rows = read_comparison(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    if rows.is_empty() {
        bail!("{} has no rows", args.input.display());
    }
    info!("Loaded {} comparison rows", rows.len());

    let out_dir = args
        .output_dir
        .unwrap_or_else(|| default_output_dir(&args.input));
    let written = render_all(&rows, &out_dir).context("Failed to render charts")?;

    print_header("Charts");
    for path in &written {
        print_success(path.display());
    }
    Ok(())
}
