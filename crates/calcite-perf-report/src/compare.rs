//! Join of two result tables into the comparison table.

use std::fmt;
use std::fs::File;
use std::path::Path;

use calcite_perf_common::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::results::{
    Metric, ResultTable, AGGREGATED, FAILURE_COUNT_COLUMN, REQUEST_COUNT_COLUMN,
};
use crate::sources::QuerySourceResolver;

/// Placeholder for values that cannot be computed or found.
pub const NOT_AVAILABLE: &str = "N/A";

/// Parse a table value as a finite number.
pub fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `(calcite - baseline) / baseline * 100` as `"12.34%"`.
///
/// A zero baseline or a non-numeric value yields [`NOT_AVAILABLE`].
pub fn percentage_change(calcite: &str, baseline: &str) -> String {
    match (parse_number(calcite), parse_number(baseline)) {
        (Some(c), Some(b)) if b != 0.0 => format!("{:.2}%", (c - b) / b * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Mode with the strictly lower average response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    Calcite,
    NonCalcite,
    Equal,
    /// An average was missing or non-numeric
    Unknown,
}

impl Winner {
    pub fn decide(calcite_avg: &str, non_calcite_avg: &str) -> Self {
        match (parse_number(calcite_avg), parse_number(non_calcite_avg)) {
            (Some(c), Some(n)) if c < n => Winner::Calcite,
            (Some(c), Some(n)) if c > n => Winner::NonCalcite,
            (Some(_), Some(_)) => Winner::Equal,
            _ => Winner::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::Calcite => "Calcite",
            Winner::NonCalcite => "Non-Calcite",
            Winner::Equal => "Equal",
            Winner::Unknown => NOT_AVAILABLE,
        }
    }

    pub fn parse(label: &str) -> Self {
        match label.trim() {
            "Calcite" => Winner::Calcite,
            "Non-Calcite" => Winner::NonCalcite,
            "Equal" => Winner::Equal,
            _ => Winner::Unknown,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much faster the winner is, relative to the loser's average.
pub fn improvement_text(winner: Winner, calcite_avg: &str, non_calcite_avg: &str) -> String {
    let (Some(c), Some(n)) = (parse_number(calcite_avg), parse_number(non_calcite_avg)) else {
        return NOT_AVAILABLE.to_string();
    };
    match winner {
        Winner::Calcite => format!("{:.2}% faster", (n - c) / n * 100.0),
        Winner::NonCalcite => format!("{:.2}% faster", (c - n) / c * 100.0),
        Winner::Equal => "Same performance".to_string(),
        Winner::Unknown => NOT_AVAILABLE.to_string(),
    }
}

/// One row of the comparison table; field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRow {
    #[serde(rename = "Query Name")]
    pub query_name: String,
    /// Query source text, PPL or DSL
    #[serde(rename = "PPL Query")]
    pub query_text: String,
    #[serde(rename = "Better Performance")]
    pub better_performance: String,
    #[serde(rename = "Performance Improvement")]
    pub performance_improvement: String,

    #[serde(rename = "Calcite Request Count")]
    pub calcite_request_count: String,
    #[serde(rename = "Non-Calcite Request Count")]
    pub non_calcite_request_count: String,

    #[serde(rename = "Calcite Median (ms)")]
    pub calcite_median: String,
    #[serde(rename = "Non-Calcite Median (ms)")]
    pub non_calcite_median: String,
    #[serde(rename = "Median Change")]
    pub median_change: String,

    #[serde(rename = "Calcite Average (ms)")]
    pub calcite_average: String,
    #[serde(rename = "Non-Calcite Average (ms)")]
    pub non_calcite_average: String,
    #[serde(rename = "Average Change")]
    pub average_change: String,

    #[serde(rename = "Calcite Min (ms)")]
    pub calcite_min: String,
    #[serde(rename = "Non-Calcite Min (ms)")]
    pub non_calcite_min: String,
    #[serde(rename = "Min Change")]
    pub min_change: String,

    #[serde(rename = "Calcite Max (ms)")]
    pub calcite_max: String,
    #[serde(rename = "Non-Calcite Max (ms)")]
    pub non_calcite_max: String,
    #[serde(rename = "Max Change")]
    pub max_change: String,

    #[serde(rename = "Calcite 95% (ms)")]
    pub calcite_p95: String,
    #[serde(rename = "Non-Calcite 95% (ms)")]
    pub non_calcite_p95: String,
    #[serde(rename = "95% Change")]
    pub p95_change: String,

    #[serde(rename = "Calcite 99% (ms)")]
    pub calcite_p99: String,
    #[serde(rename = "Non-Calcite 99% (ms)")]
    pub non_calcite_p99: String,
    #[serde(rename = "99% Change")]
    pub p99_change: String,

    #[serde(rename = "Calcite Requests/s")]
    pub calcite_rps: String,
    #[serde(rename = "Non-Calcite Requests/s")]
    pub non_calcite_rps: String,
    #[serde(rename = "Requests/s Change")]
    pub rps_change: String,

    #[serde(rename = "Calcite Failures")]
    pub calcite_failures: String,
    #[serde(rename = "Non-Calcite Failures")]
    pub non_calcite_failures: String,
}

impl ComparisonRow {
    pub fn is_aggregated(&self) -> bool {
        self.query_name == AGGREGATED
    }

    pub fn winner(&self) -> Winner {
        Winner::parse(&self.better_performance)
    }

    /// Calcite value of a metric, as written.
    pub fn calcite(&self, metric: Metric) -> &str {
        match metric {
            Metric::Median => &self.calcite_median,
            Metric::Average => &self.calcite_average,
            Metric::Min => &self.calcite_min,
            Metric::Max => &self.calcite_max,
            Metric::P95 => &self.calcite_p95,
            Metric::P99 => &self.calcite_p99,
            Metric::RequestsPerSec => &self.calcite_rps,
        }
    }

    /// Non-Calcite value of a metric, as written.
    pub fn non_calcite(&self, metric: Metric) -> &str {
        match metric {
            Metric::Median => &self.non_calcite_median,
            Metric::Average => &self.non_calcite_average,
            Metric::Min => &self.non_calcite_min,
            Metric::Max => &self.non_calcite_max,
            Metric::P95 => &self.non_calcite_p95,
            Metric::P99 => &self.non_calcite_p99,
            Metric::RequestsPerSec => &self.non_calcite_rps,
        }
    }

    pub fn change(&self, metric: Metric) -> &str {
        match metric {
            Metric::Median => &self.median_change,
            Metric::Average => &self.average_change,
            Metric::Min => &self.min_change,
            Metric::Max => &self.max_change,
            Metric::P95 => &self.p95_change,
            Metric::P99 => &self.p99_change,
            Metric::RequestsPerSec => &self.rps_change,
        }
    }

    /// Improvement percentage as a number, if the row has one.
    pub fn improvement_percent(&self) -> Option<f64> {
        self.performance_improvement
            .split('%')
            .next()
            .and_then(parse_number)
    }

    fn build(name: &str, calcite: &ResultTable, non_calcite: &ResultTable, query_text: String) -> Self {
        let c = |column: &str| calcite.get(name, column).unwrap_or(NOT_AVAILABLE).to_string();
        let n = |column: &str| non_calcite.get(name, column).unwrap_or(NOT_AVAILABLE).to_string();
        let change = |metric: Metric| {
            percentage_change(
                calcite.get(name, metric.column()).unwrap_or(NOT_AVAILABLE),
                non_calcite.get(name, metric.column()).unwrap_or(NOT_AVAILABLE),
            )
        };

        let calcite_avg = c(Metric::Average.column());
        let non_calcite_avg = n(Metric::Average.column());
        let winner = Winner::decide(&calcite_avg, &non_calcite_avg);

        Self {
            query_name: name.to_string(),
            query_text,
            better_performance: winner.to_string(),
            performance_improvement: improvement_text(winner, &calcite_avg, &non_calcite_avg),
            calcite_request_count: c(REQUEST_COUNT_COLUMN),
            non_calcite_request_count: n(REQUEST_COUNT_COLUMN),
            calcite_median: c(Metric::Median.column()),
            non_calcite_median: n(Metric::Median.column()),
            median_change: change(Metric::Median),
            calcite_average: calcite_avg,
            non_calcite_average: non_calcite_avg,
            average_change: change(Metric::Average),
            calcite_min: c(Metric::Min.column()),
            non_calcite_min: n(Metric::Min.column()),
            min_change: change(Metric::Min),
            calcite_max: c(Metric::Max.column()),
            non_calcite_max: n(Metric::Max.column()),
            max_change: change(Metric::Max),
            calcite_p95: c(Metric::P95.column()),
            non_calcite_p95: n(Metric::P95.column()),
            p95_change: change(Metric::P95),
            calcite_p99: c(Metric::P99.column()),
            non_calcite_p99: n(Metric::P99.column()),
            p99_change: change(Metric::P99),
            calcite_rps: c(Metric::RequestsPerSec.column()),
            non_calcite_rps: n(Metric::RequestsPerSec.column()),
            rps_change: change(Metric::RequestsPerSec),
            calcite_failures: c(FAILURE_COUNT_COLUMN),
            non_calcite_failures: n(FAILURE_COUNT_COLUMN),
        }
    }
}

/// Result of joining two tables.
#[derive(Debug, Clone, Default)]
pub struct Comparison {
    /// Joined rows sorted by query name
    pub rows: Vec<ComparisonRow>,
    /// Names only present in the Calcite table
    pub calcite_only: Vec<String>,
    /// Names only present in the Non-Calcite table
    pub non_calcite_only: Vec<String>,
    /// Joined names whose query source was not found
    pub missing_sources: Vec<String>,
}

impl Comparison {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn aggregated(&self) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.is_aggregated())
    }

    pub fn dropped(&self) -> usize {
        self.calcite_only.len() + self.non_calcite_only.len()
    }
}

/// Join on exact request name.
///
/// Names present in only one table are left out and reported in the result
/// (and as warnings). Query text is looked up when a resolver is given; the
/// aggregated row never gets one.
pub fn compare_tables(
    calcite: &ResultTable,
    non_calcite: &ResultTable,
    sources: Option<&QuerySourceResolver>,
) -> Comparison {
    let mut comparison = Comparison::default();

    // Both name iterators are sorted, so output rows are too.
    for name in calcite.names() {
        if !non_calcite.contains(name) {
            warn!("'{}' only present in the Calcite results, skipping", name);
            comparison.calcite_only.push(name.to_string());
            continue;
        }

        let query_text = if name == AGGREGATED {
            NOT_AVAILABLE.to_string()
        } else {
            match sources.and_then(|s| s.resolve(name)) {
                Some(text) => text,
                None => {
                    if sources.is_some() {
                        warn!("No query source found for '{}'", name);
                        comparison.missing_sources.push(name.to_string());
                    }
                    NOT_AVAILABLE.to_string()
                }
            }
        };

        comparison
            .rows
            .push(ComparisonRow::build(name, calcite, non_calcite, query_text));
    }

    for name in non_calcite.names().filter(|n| !calcite.contains(n)) {
        warn!("'{}' only present in the Non-Calcite results, skipping", name);
        comparison.non_calcite_only.push(name.to_string());
    }

    comparison
}

/// Write the comparison table as CSV.
pub fn write_comparison(path: &Path, rows: &[ComparisonRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a comparison table written by [`write_comparison`].
pub fn read_comparison(path: &Path) -> Result<Vec<ComparisonRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
