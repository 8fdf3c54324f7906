//! Final result reporting.

use std::fs::File;
use std::path::{Path, PathBuf};

use calcite_perf_common::format::format_number;
use calcite_perf_common::output::{print_header, print_table};
use calcite_perf_common::Result;
use csv::Writer;
use tabled::Tabled;

use crate::stats::{StatsRow, StatsSnapshot};

/// Sink for a finished run.
pub trait Reporter {
    fn report(&self, snapshot: &StatsSnapshot) -> Result<()>;
}

#[derive(Tabled)]
struct ConsoleRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "# reqs")]
    requests: String,
    #[tabled(rename = "# fails")]
    failures: String,
    #[tabled(rename = "Avg (ms)")]
    average: String,
    #[tabled(rename = "Min (ms)")]
    min: String,
    #[tabled(rename = "Max (ms)")]
    max: String,
    #[tabled(rename = "Med (ms)")]
    median: u64,
    #[tabled(rename = "95% (ms)")]
    p95: u64,
    #[tabled(rename = "99% (ms)")]
    p99: u64,
    #[tabled(rename = "req/s")]
    rps: String,
}

impl From<&StatsRow> for ConsoleRow {
    fn from(row: &StatsRow) -> Self {
        let fail_pct = if row.request_count > 0 {
            row.failure_count as f64 * 100.0 / row.request_count as f64
        } else {
            0.0
        };
        Self {
            name: row.name.clone(),
            requests: format_number(row.request_count),
            failures: format!("{} ({:.1}%)", row.failure_count, fail_pct),
            average: format!("{:.2}", row.average),
            min: format!("{:.2}", row.min),
            max: format!("{:.2}", row.max),
            median: row.median,
            p95: row.p95,
            p99: row.p99,
            rps: format!("{:.2}", row.requests_per_sec),
        }
    }
}

/// Table of per-query statistics on stdout.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, snapshot: &StatsSnapshot) -> Result<()> {
        print_header(&format!(
            "Load test results ({:.1}s)",
            snapshot.elapsed_secs
        ));
        print_table(snapshot.all_rows().map(ConsoleRow::from).collect());

        if !snapshot.failures.is_empty() {
            println!("\nFailures:");
            for failure in &snapshot.failures {
                println!(
                    "  {:>6}  {} {}: {}",
                    failure.occurrences, failure.method, failure.name, failure.error
                );
            }
        }
        println!();
        Ok(())
    }
}

/// `<prefix>_stats.csv` and `<prefix>_failures.csv`.
pub struct CsvReporter {
    prefix: String,
}

impl CsvReporter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn stats_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_stats.csv", self.prefix))
    }

    pub fn failures_path(&self) -> PathBuf {
        PathBuf::from(format!("{}_failures.csv", self.prefix))
    }
}

impl Reporter for CsvReporter {
    fn report(&self, snapshot: &StatsSnapshot) -> Result<()> {
        create_parent(&self.stats_path())?;

        let mut writer = Writer::from_writer(File::create(self.stats_path())?);
        for row in snapshot.all_rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let mut writer = Writer::from_writer(File::create(self.failures_path())?);
        if snapshot.failures.is_empty() {
            writer.write_record(["Method", "Name", "Error", "Occurrences"])?;
        }
        for failure in &snapshot.failures {
            writer.serialize(failure)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Full snapshot as pretty JSON.
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonReporter {
    fn report(&self, snapshot: &StatsSnapshot) -> Result<()> {
        create_parent(&self.path)?;
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RequestOutcome;
    use crate::stats::StatsCollector;
    use std::time::Duration;

    fn snapshot() -> StatsSnapshot {
        let stats = StatsCollector::new().unwrap();
        stats.record(&RequestOutcome {
            name: "PPL Query: vpc/a".to_string(),
            elapsed: Duration::from_millis(12),
            content_length: 10,
            error: None,
        });
        stats.record(&RequestOutcome {
            name: "PPL Query: vpc/a".to_string(),
            elapsed: Duration::from_millis(40),
            content_length: 10,
            error: Some("Got status code 500".to_string()),
        });
        stats.snapshot_with_elapsed(Duration::from_secs(4))
    }

    #[test]
    fn test_stats_csv_uses_locust_columns() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("results/calcite");
        let reporter = CsvReporter::new(prefix.to_string_lossy());
        reporter.report(&snapshot()).unwrap();

        let mut reader = csv::Reader::from_path(reporter.stats_path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Type");
        assert_eq!(&headers[1], "Name");
        assert_eq!(&headers[4], "Median Response Time");
        assert_eq!(&headers[9], "Requests/s");
        assert_eq!(&headers[headers.len() - 1], "100%");

        let rows: Vec<StatsRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "PPL Query: vpc/a");
        assert_eq!(rows[1].name, "Aggregated");
        assert_eq!(rows[1].request_count, 2);
        assert_eq!(rows[1].failure_count, 1);
        assert_eq!(rows[1].requests_per_sec, 0.5);

        let failures = std::fs::read_to_string(reporter.failures_path()).unwrap();
        assert!(failures.starts_with("Method,Name,Error,Occurrences"));
        assert!(failures.contains("POST,PPL Query: vpc/a,Got status code 500,1"));
    }

    #[test]
    fn test_failures_csv_has_header_without_failures() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = CsvReporter::new(dir.path().join("run").to_string_lossy());
        let empty = StatsCollector::new()
            .unwrap()
            .snapshot_with_elapsed(Duration::from_secs(1));
        reporter.report(&empty).unwrap();
        let failures = std::fs::read_to_string(reporter.failures_path()).unwrap();
        assert_eq!(failures.trim(), "Method,Name,Error,Occurrences");
    }

    #[test]
    fn test_json_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        JsonReporter::new(&path).report(&snapshot()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["aggregated"]["Request Count"], 2);
        assert_eq!(value["rows"][0]["Name"], "PPL Query: vpc/a");
    }
}
