//! Calcite vs Non-Calcite result comparison
//!
//! Joins two Locust-style stats files on the request name and writes the
//! per-query comparison table. Without two file arguments the tool asks for
//! its inputs on the terminal.

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use calcite_perf_common::output::{
    print_error, print_header, print_info, print_success, print_table, print_warning,
};
use calcite_perf_common::LogType;
use calcite_perf_report::interactive::Prompter;
use calcite_perf_report::sources::candidate_roots;
use calcite_perf_report::{
    compare_tables, write_comparison, Comparison, ComparisonSummary, QuerySourceResolver,
    ResultTable,
};
use clap::Parser;
use colored::Colorize;
use tabled::Tabled;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_OUTPUT: &str = "calcite_vs_non_calcite_comparison.csv";

#[derive(Parser, Debug)]
#[command(
    name = "calcite-compare",
    about = "Compare Calcite and Non-Calcite load test results",
    version
)]
struct Args {
    /// Stats CSV of the Calcite run
    calcite: Option<PathBuf>,

    /// Stats CSV of the Non-Calcite run
    non_calcite: Option<PathBuf>,

    /// Comparison CSV to write
    output: Option<PathBuf>,

    /// Log type used to find query sources (detected from the file name if unset)
    #[arg(short = 'l', long, value_enum)]
    log_type: Option<LogType>,

    /// Extra directory searched for `ppl/` and `dsl/` query sources
    #[arg(short = 'q', long)]
    queries_dir: Option<PathBuf>,
}

struct Inputs {
    calcite: PathBuf,
    non_calcite: PathBuf,
    output: PathBuf,
    log_type: Option<LogType>,
}

#[derive(Tabled)]
struct AggregatedLine {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Calcite")]
    calcite: String,
    #[tabled(rename = "Non-Calcite")]
    non_calcite: String,
    #[tabled(rename = "Change")]
    change: String,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let inputs = match (&args.calcite, &args.non_calcite) {
        (Some(calcite), Some(non_calcite)) => from_arguments(&args, calcite, non_calcite)?,
        _ => from_prompts(&args)?,
    };

    let calcite = ResultTable::from_path(&inputs.calcite)
        .with_context(|| format!("Failed to read {}", inputs.calcite.display()))?;
    let non_calcite = ResultTable::from_path(&inputs.non_calcite)
        .with_context(|| format!("Failed to read {}", inputs.non_calcite.display()))?;
    info!(
        "Loaded {} Calcite rows and {} Non-Calcite rows",
        calcite.len(),
        non_calcite.len()
    );

    let resolver = inputs.log_type.map(|log_type| {
        info!("Looking up {} query sources", log_type);
        let roots = candidate_roots(args.queries_dir.as_deref(), &inputs.calcite);
        QuerySourceResolver::discover(log_type, &roots)
    });
    if resolver.as_ref().is_some_and(|r| r.is_empty()) {
        print_warning("No query source directories found, query text will be N/A");
    }

    let comparison = compare_tables(&calcite, &non_calcite, resolver.as_ref());
    if comparison.is_empty() {
        bail!("No queries are present in both result files");
    }

    write_comparison(&inputs.output, &comparison.rows)
        .with_context(|| format!("Failed to write {}", inputs.output.display()))?;

    print_summary(&comparison);
    print_success(format!(
        "Comparison of {} rows written to {}",
        comparison.rows.len(),
        inputs.output.display()
    ));
    Ok(())
}

fn from_arguments(args: &Args, calcite: &Path, non_calcite: &Path) -> Result<Inputs> {
    for path in [calcite, non_calcite] {
        if !path.is_file() {
            bail!("File not found: {}", path.display());
        }
    }
    Ok(Inputs {
        calcite: calcite.to_path_buf(),
        non_calcite: non_calcite.to_path_buf(),
        output: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
        log_type: args.log_type.or_else(|| LogType::detect(calcite)),
    })
}

fn from_prompts(args: &Args) -> Result<Inputs> {
    print_header("Calcite vs Non-Calcite Comparison");
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());

    let Some(calcite) = prompter.existing_file("Calcite results CSV: ")? else {
        bail!("No Calcite results file given");
    };
    let Some(non_calcite) = prompter.existing_file("Non-Calcite results CSV: ")? else {
        bail!("No Non-Calcite results file given");
    };
    let log_type = match args.log_type {
        Some(log_type) => Some(log_type),
        None => prompter.log_type(LogType::detect(&calcite))?,
    };
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_beside(&calcite));

    Ok(Inputs {
        calcite,
        non_calcite,
        output,
        log_type,
    })
}

fn default_output_beside(calcite: &Path) -> PathBuf {
    match calcite.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(DEFAULT_OUTPUT),
        _ => PathBuf::from(DEFAULT_OUTPUT),
    }
}

fn print_summary(comparison: &Comparison) {
    let summary = ComparisonSummary::from_rows(&comparison.rows);

    if let Some(agg) = &summary.aggregated {
        print_header("Aggregated Results");
        print_table(vec![
            AggregatedLine {
                metric: "Average (ms)",
                calcite: agg.calcite_average.clone(),
                non_calcite: agg.non_calcite_average.clone(),
                change: agg.average_change.clone(),
            },
            AggregatedLine {
                metric: "Median (ms)",
                calcite: agg.calcite_median.clone(),
                non_calcite: agg.non_calcite_median.clone(),
                change: agg.median_change.clone(),
            },
            AggregatedLine {
                metric: "Requests",
                calcite: agg.calcite_requests.clone(),
                non_calcite: agg.non_calcite_requests.clone(),
                change: agg.requests_change.clone(),
            },
            AggregatedLine {
                metric: "Requests/s",
                calcite: agg.calcite_rps.clone(),
                non_calcite: agg.non_calcite_rps.clone(),
                change: agg.rps_change.clone(),
            },
        ]);
        println!(
            "Overall: {} ({})",
            agg.winner.to_string().bold(),
            agg.improvement
        );
    }

    print_header("Per-query Results");
    println!("Queries compared: {}", summary.compared);
    println!(
        "{} {} ({:.1}%)",
        "Calcite faster:".cyan(),
        summary.calcite_wins,
        summary.calcite_win_percent()
    );
    println!(
        "{} {} ({:.1}%)",
        "Non-Calcite faster:".magenta(),
        summary.non_calcite_wins,
        summary.non_calcite_win_percent()
    );
    println!("Equal: {}", summary.ties);
    if summary.undecided > 0 {
        print_warning(format!(
            "{} queries had non-numeric averages",
            summary.undecided
        ));
    }

    if comparison.dropped() > 0 {
        print_warning(format!(
            "{} queries only in Calcite results, {} only in Non-Calcite results (not compared)",
            comparison.calcite_only.len(),
            comparison.non_calcite_only.len()
        ));
    }
    if !comparison.missing_sources.is_empty() {
        print_info(format!(
            "{} queries without a source file",
            comparison.missing_sources.len()
        ));
    }
}
