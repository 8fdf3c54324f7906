//! Command-line arguments for `calcite-datagen`.

use std::path::PathBuf;
use std::time::Duration;

use calcite_perf_common::parse_duration;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "calcite-datagen",
    about = "Generate synthetic logs or ingest NDJSON files into OpenSearch",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate VPC flow logs
    Vpc(GenerateArgs),
    /// Generate AWS Network Firewall logs
    Nfw(GenerateArgs),
    /// Generate CloudTrail logs
    Cloudtrail(GenerateArgs),
    /// Generate WAF logs
    Waf(GenerateArgs),
    /// Ingest a JSON-lines document file (e.g. the big5 corpus)
    Ingest(IngestArgs),
}

/// Overrides for a generator's defaults.
#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Total documents to generate
    #[arg(long, env = "TARGET_DOCS", default_value = "100000000")]
    pub target_docs: u64,

    /// Documents per bulk request (generator default when omitted)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Concurrent workers (generator default when omitted)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Stop a worker after more than this many failed batches in a row
    #[arg(long)]
    pub max_consecutive_failures: Option<u32>,

    /// Pause between batches inside a worker (e.g. "20ms")
    #[arg(long, value_parser = parse_duration)]
    pub batch_delay: Option<Duration>,

    /// Skip the 10 document test write to `test-index`
    #[arg(long)]
    pub skip_connection_test: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// JSON-lines file, one document per line
    pub file: PathBuf,

    /// Documents per bulk request
    #[arg(long, default_value = "1000")]
    pub batch_size: usize,

    /// Pause between batches
    #[arg(long, value_parser = parse_duration, default_value = "200ms")]
    pub batch_delay: Duration,

    /// Value written into every document's @timestamp
    #[arg(long, default_value = "2024-01-01T00:00:00Z")]
    pub timestamp: String,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generator_overrides() {
        let cli = Cli::parse_from([
            "calcite-datagen",
            "cloudtrail",
            "--target-docs",
            "5000",
            "--workers",
            "2",
            "--batch-delay",
            "50ms",
        ]);
        match cli.command {
            Command::Cloudtrail(args) => {
                assert_eq!(args.target_docs, 5000);
                assert_eq!(args.workers, Some(2));
                assert_eq!(args.batch_size, None);
                assert_eq!(args.batch_delay, Some(Duration::from_millis(50)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_ingest_defaults() {
        let cli = Cli::parse_from(["calcite-datagen", "ingest", "documents.json"]);
        match cli.command {
            Command::Ingest(args) => {
                assert_eq!(args.batch_size, 1000);
                assert_eq!(args.batch_delay, Duration::from_millis(200));
                assert_eq!(args.timestamp, "2024-01-01T00:00:00Z");
                assert!(!args.insecure);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
