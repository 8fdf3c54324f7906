//! Command-line arguments for `calcite-loadtest`.

use std::path::PathBuf;
use std::time::Duration;

use calcite_perf_common::parse_duration;
use calcite_perf_loadtest::{LoadTestConfig, LogSelection, QueryType};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "calcite-loadtest",
    about = "Replay PPL and DSL queries against OpenSearch with simulated users",
    version
)]
pub struct Args {
    /// Directory containing the `ppl/` and `dsl/` query trees
    #[arg(short = 'q', long, env = "QUERIES_DIR", default_value = ".")]
    pub queries_dir: PathBuf,

    /// Log type whose queries are loaded (vpc, nfw, cloudtrail, waf, big5 or all)
    #[arg(short = 'l', long, env = "LOG_TYPE", default_value = "all")]
    pub log_type: LogSelection,

    /// Query language(s) to send
    #[arg(long, env = "QUERY_TYPE", value_enum, ignore_case = true, default_value = "ppl")]
    pub query_type: QueryType,

    /// Number of simulated users
    #[arg(short = 'u', long, default_value = "10")]
    pub users: usize,

    /// Users started per second
    #[arg(short = 'r', long, default_value = "1")]
    pub spawn_rate: f64,

    /// Test duration (e.g., "60s", "5m", "1h"); 0 runs until interrupted
    #[arg(short = 't', long, value_parser = parse_duration, default_value = "60s")]
    pub run_time: Duration,

    /// Minimum wait between two requests of one user
    #[arg(long, value_parser = parse_duration, default_value = "1s")]
    pub wait_min: Duration,

    /// Maximum wait between two requests of one user
    #[arg(long, value_parser = parse_duration, default_value = "3s")]
    pub wait_max: Duration,

    /// Per-request timeout
    #[arg(long, value_parser = parse_duration, default_value = "60s")]
    pub timeout: Duration,

    /// Interval of the periodic console line; 0 disables it
    #[arg(long, value_parser = parse_duration, default_value = "10s")]
    pub report_interval: Duration,

    /// Prefix of the `_stats.csv` and `_failures.csv` outputs
    #[arg(long = "csv", default_value = "results")]
    pub csv_prefix: String,

    /// Also write the full report as JSON
    #[arg(long = "json")]
    pub json_output: Option<PathBuf>,
}

impl Args {
    pub fn load_test_config(&self) -> LoadTestConfig {
        LoadTestConfig {
            users: self.users,
            spawn_rate: self.spawn_rate,
            run_time: (!self.run_time.is_zero()).then_some(self.run_time),
            wait_min: self.wait_min,
            wait_max: self.wait_max,
            request_timeout: self.timeout,
            report_interval: self.report_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcite_perf_common::LogType;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["calcite-loadtest"]);
        let config = args.load_test_config();
        assert_eq!(config.users, 10);
        assert_eq!(config.run_time, Some(Duration::from_secs(60)));
        assert_eq!(config.wait_min, Duration::from_secs(1));
        assert_eq!(config.wait_max, Duration::from_secs(3));
        assert_eq!(args.csv_prefix, "results");
    }

    #[test]
    fn test_zero_run_time_means_unbounded() {
        let args = Args::parse_from([
            "calcite-loadtest",
            "--run-time",
            "0",
            "--log-type",
            "waf",
            "--query-type",
            "BOTH",
        ]);
        assert_eq!(args.load_test_config().run_time, None);
        assert_eq!(args.log_type, LogSelection::One(LogType::Waf));
        assert_eq!(args.query_type, QueryType::Both);
    }
}
