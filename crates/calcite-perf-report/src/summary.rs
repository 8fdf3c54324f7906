//! Console-level statistics over a comparison table.

use crate::compare::{percentage_change, ComparisonRow, Winner};
use crate::results::Metric;

/// Win counts over the per-query rows (the aggregated row excluded).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSummary {
    pub compared: usize,
    pub calcite_wins: usize,
    pub non_calcite_wins: usize,
    pub ties: usize,
    /// Rows whose averages were not numeric
    pub undecided: usize,
    pub aggregated: Option<AggregatedSummary>,
}

impl ComparisonSummary {
    pub fn from_rows(rows: &[ComparisonRow]) -> Self {
        let mut summary = Self::default();
        for row in rows {
            if row.is_aggregated() {
                summary.aggregated = Some(AggregatedSummary::from_row(row));
                continue;
            }
            summary.compared += 1;
            match row.winner() {
                Winner::Calcite => summary.calcite_wins += 1,
                Winner::NonCalcite => summary.non_calcite_wins += 1,
                Winner::Equal => summary.ties += 1,
                Winner::Unknown => summary.undecided += 1,
            }
        }
        summary
    }

    pub fn calcite_win_percent(&self) -> f64 {
        share(self.calcite_wins, self.compared)
    }

    pub fn non_calcite_win_percent(&self) -> f64 {
        share(self.non_calcite_wins, self.compared)
    }
}

fn share(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Headline numbers from the `Aggregated` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedSummary {
    pub calcite_average: String,
    pub non_calcite_average: String,
    pub average_change: String,
    pub calcite_median: String,
    pub non_calcite_median: String,
    pub median_change: String,
    pub calcite_requests: String,
    pub non_calcite_requests: String,
    pub requests_change: String,
    pub calcite_rps: String,
    pub non_calcite_rps: String,
    pub rps_change: String,
    pub winner: Winner,
    pub improvement: String,
}

impl AggregatedSummary {
    pub fn from_row(row: &ComparisonRow) -> Self {
        Self {
            calcite_average: row.calcite(Metric::Average).to_string(),
            non_calcite_average: row.non_calcite(Metric::Average).to_string(),
            average_change: row.change(Metric::Average).to_string(),
            calcite_median: row.calcite(Metric::Median).to_string(),
            non_calcite_median: row.non_calcite(Metric::Median).to_string(),
            median_change: row.change(Metric::Median).to_string(),
            calcite_requests: row.calcite_request_count.clone(),
            non_calcite_requests: row.non_calcite_request_count.clone(),
            requests_change: percentage_change(
                &row.calcite_request_count,
                &row.non_calcite_request_count,
            ),
            calcite_rps: row.calcite(Metric::RequestsPerSec).to_string(),
            non_calcite_rps: row.non_calcite(Metric::RequestsPerSec).to_string(),
            rps_change: row.change(Metric::RequestsPerSec).to_string(),
            winner: row.winner(),
            improvement: row.performance_improvement.clone(),
        }
    }
}
