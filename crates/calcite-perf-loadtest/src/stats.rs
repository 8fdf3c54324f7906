//! Per-request-name latency statistics.
//!
//! Latencies are recorded in microseconds into an HDR histogram per name and
//! reported in milliseconds, using the column names of Locust's
//! `_stats.csv` and `_failures.csv`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use calcite_perf_common::{Error, Result};
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::RequestOutcome;

/// Name of the all-requests row.
pub const AGGREGATED: &str = "Aggregated";
/// HTTP method every query is sent with.
pub const METHOD: &str = "POST";

/// Percentiles written to the stats CSV, in column order.
pub const PERCENTILES: [f64; 11] = [
    0.50, 0.66, 0.75, 0.80, 0.90, 0.95, 0.98, 0.99, 0.999, 0.9999, 1.0,
];

// 1 us to 1 hour, 3 significant figures
const MAX_LATENCY_US: u64 = 3_600_000_000;


#[derive(Debug, Clone)]
struct StatsEntry {
    num_requests: u64,
    num_failures: u64,
    total_response_us: u128,
    min_us: u64,
    max_us: u64,
    total_content_length: u64,
    histogram: Histogram<u64>,
}

impl StatsEntry {
    fn new(histogram: &Histogram<u64>) -> Self {
        Self {
            num_requests: 0,
            num_failures: 0,
            total_response_us: 0,
            min_us: u64::MAX,
            max_us: 0,
            total_content_length: 0,
            histogram: histogram.clone(),
        }
    }

    fn record(&mut self, elapsed: Duration, content_length: u64, failed: bool) {
        let us = (elapsed.as_micros() as u64).clamp(1, MAX_LATENCY_US);
        self.num_requests += 1;
        if failed {
            self.num_failures += 1;
        }
        self.total_response_us += us as u128;
        self.min_us = self.min_us.min(us);
        self.max_us = self.max_us.max(us);
        self.total_content_length += content_length;
        self.histogram.saturating_record(us);
    }

    fn merge(&mut self, other: &StatsEntry) {
        self.num_requests += other.num_requests;
        self.num_failures += other.num_failures;
        self.total_response_us += other.total_response_us;
        self.min_us = self.min_us.min(other.min_us);
        self.max_us = self.max_us.max(other.max_us);
        self.total_content_length += other.total_content_length;
        if let Err(e) = self.histogram.add(&other.histogram) {
            warn!("Could not merge latency histograms: {}", e);
        }
    }

    fn to_row(&self, kind: &str, name: &str, elapsed_secs: f64) -> StatsRow {
        let ms = |us: u64| us as f64 / 1000.0;
        let pct = |q: f64| {
            if self.num_requests == 0 {
                0
            } else {
                (ms(self.histogram.value_at_quantile(q))).round() as u64
            }
        };
        let (avg, min, avg_size) = if self.num_requests == 0 {
            (0.0, 0.0, 0.0)
        } else {
            (
                self.total_response_us as f64 / 1000.0 / self.num_requests as f64,
                ms(self.min_us),
                self.total_content_length as f64 / self.num_requests as f64,
            )
        };
        let per_sec = |n: u64| {
            if elapsed_secs > 0.0 {
                round2(n as f64 / elapsed_secs)
            } else {
                0.0
            }
        };

        StatsRow {
            kind: kind.to_string(),
            name: name.to_string(),
            request_count: self.num_requests,
            failure_count: self.num_failures,
            median: pct(0.5),
            average: round2(avg),
            min: round2(min),
            max: round2(ms(self.max_us)),
            average_content_size: round2(avg_size),
            requests_per_sec: per_sec(self.num_requests),
            failures_per_sec: per_sec(self.num_failures),
            p50: pct(PERCENTILES[0]),
            p66: pct(PERCENTILES[1]),
            p75: pct(PERCENTILES[2]),
            p80: pct(PERCENTILES[3]),
            p90: pct(PERCENTILES[4]),
            p95: pct(PERCENTILES[5]),
            p98: pct(PERCENTILES[6]),
            p99: pct(PERCENTILES[7]),
            p999: pct(PERCENTILES[8]),
            p9999: pct(PERCENTILES[9]),
            p100: pct(PERCENTILES[10]),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One row of `_stats.csv`. Times in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRow {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Request Count")]
    pub request_count: u64,
    #[serde(rename = "Failure Count")]
    pub failure_count: u64,
    #[serde(rename = "Median Response Time")]
    pub median: u64,
    #[serde(rename = "Average Response Time")]
    pub average: f64,
    #[serde(rename = "Min Response Time")]
    pub min: f64,
    #[serde(rename = "Max Response Time")]
    pub max: f64,
    #[serde(rename = "Average Content Size")]
    pub average_content_size: f64,
    #[serde(rename = "Requests/s")]
    pub requests_per_sec: f64,
    #[serde(rename = "Failures/s")]
    pub failures_per_sec: f64,
    #[serde(rename = "50%")]
    pub p50: u64,
    #[serde(rename = "66%")]
    pub p66: u64,
    #[serde(rename = "75%")]
    pub p75: u64,
    #[serde(rename = "80%")]
    pub p80: u64,
    #[serde(rename = "90%")]
    pub p90: u64,
    #[serde(rename = "95%")]
    pub p95: u64,
    #[serde(rename = "98%")]
    pub p98: u64,
    #[serde(rename = "99%")]
    pub p99: u64,
    #[serde(rename = "99.9%")]
    pub p999: u64,
    #[serde(rename = "99.99%")]
    pub p9999: u64,
    #[serde(rename = "100%")]
    pub p100: u64,
}

/// One row of `_failures.csv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRow {
    #[serde(rename = "Method")]
    pub method: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Occurrences")]
    pub occurrences: u64,
}

/// Point-in-time copy of all statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub elapsed_secs: f64,
    /// Per-name rows sorted by name
    pub rows: Vec<StatsRow>,
    pub aggregated: StatsRow,
    pub failures: Vec<FailureRow>,
}

impl StatsSnapshot {
    /// Per-name rows followed by the aggregated row.
    pub fn all_rows(&self) -> impl Iterator<Item = &StatsRow> {
        self.rows.iter().chain(std::iter::once(&self.aggregated))
    }
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<String, StatsEntry>,
    failures: BTreeMap<(String, String), u64>,
}

/// Thread-safe sink shared by all simulated users.
pub struct StatsCollector {
    inner: Mutex<Inner>,
    /// Empty histogram cloned for every new name
    template: Histogram<u64>,
    started: Instant,
}

impl StatsCollector {
    pub fn new() -> Result<Self> {
        let template = Histogram::new_with_bounds(1, MAX_LATENCY_US, 3)
            .map_err(|e| Error::Configuration(format!("Failed to create histogram: {e}")))?;
        Ok(Self {
            inner: Mutex::new(Inner::default()),
            template,
            started: Instant::now(),
        })
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        let mut inner = self.inner.lock();
        inner
            .entries
            .entry(outcome.name.clone())
            .or_insert_with(|| StatsEntry::new(&self.template))
            .record(outcome.elapsed, outcome.content_length, !outcome.is_success());
        if let Some(error) = &outcome.error {
            *inner
                .failures
                .entry((outcome.name.clone(), error.clone()))
                .or_insert(0) += 1;
        }
    }

    /// Total requests and failures so far.
    pub fn totals(&self) -> (u64, u64) {
        let inner = self.inner.lock();
        inner.entries.values().fold((0, 0), |(r, f), e| {
            (r + e.num_requests, f + e.num_failures)
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_with_elapsed(self.elapsed())
    }

    /// Snapshot with rates computed over `elapsed`.
    pub fn snapshot_with_elapsed(&self, elapsed: Duration) -> StatsSnapshot {
        let inner = self.inner.lock();
        let secs = elapsed.as_secs_f64();

        let mut total = StatsEntry::new(&self.template);
        let rows = inner
            .entries
            .iter()
            .map(|(name, entry)| {
                total.merge(entry);
                entry.to_row(METHOD, name, secs)
            })
            .collect();

        let mut failures: Vec<FailureRow> = inner
            .failures
            .iter()
            .map(|((name, error), count)| FailureRow {
                method: METHOD.to_string(),
                name: name.clone(),
                error: error.clone(),
                occurrences: *count,
            })
            .collect();
        failures.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));

        StatsSnapshot {
            elapsed_secs: secs,
            rows,
            aggregated: total.to_row("", AGGREGATED, secs),
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, ms: u64, error: Option<&str>) -> RequestOutcome {
        RequestOutcome {
            name: name.to_string(),
            elapsed: Duration::from_millis(ms),
            content_length: 100,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_rows_and_aggregate() {
        let stats = StatsCollector::new().unwrap();
        stats.record(&outcome("PPL Query: vpc/a", 10, None));
        stats.record(&outcome("PPL Query: vpc/a", 30, None));
        stats.record(&outcome("PPL Query: vpc/b", 20, Some("Got status code 500")));

        let snap = stats.snapshot_with_elapsed(Duration::from_secs(2));
        assert_eq!(snap.rows.len(), 2);

        let a = &snap.rows[0];
        assert_eq!(a.name, "PPL Query: vpc/a");
        assert_eq!(a.kind, "POST");
        assert_eq!(a.request_count, 2);
        assert_eq!(a.failure_count, 0);
        assert_eq!(a.average, 20.0);
        assert_eq!(a.min, 10.0);
        assert_eq!(a.max, 30.0);
        assert_eq!(a.requests_per_sec, 1.0);
        assert_eq!(a.p100, 30);

        let agg = &snap.aggregated;
        assert_eq!(agg.name, AGGREGATED);
        assert_eq!(agg.kind, "");
        assert_eq!(agg.request_count, 3);
        assert_eq!(agg.failure_count, 1);
        assert_eq!(agg.median, 20);
        assert_eq!(agg.failures_per_sec, 0.5);

        assert_eq!(stats.totals(), (3, 1));
    }

    #[test]
    fn test_failures_grouped_by_name_and_error() {
        let stats = StatsCollector::new().unwrap();
        for _ in 0..3 {
            stats.record(&outcome("DSL Query: waf/x", 5, Some("Got status code 400")));
        }
        stats.record(&outcome("DSL Query: waf/x", 5, Some("Request failed: timeout")));

        let snap = stats.snapshot();
        assert_eq!(snap.failures.len(), 2);
        assert_eq!(snap.failures[0].occurrences, 3);
        assert_eq!(snap.failures[0].error, "Got status code 400");
        assert_eq!(snap.failures[0].method, "POST");
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = StatsCollector::new().unwrap().snapshot_with_elapsed(Duration::ZERO);
        assert!(snap.rows.is_empty());
        assert_eq!(snap.aggregated.request_count, 0);
        assert_eq!(snap.aggregated.median, 0);
        assert_eq!(snap.all_rows().count(), 1);
    }
}
