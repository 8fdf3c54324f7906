//! PNG charts over a comparison table.

use std::path::{Path, PathBuf};

use calcite_perf_common::{Error, Result};
use plotters::prelude::*;
use tracing::{debug, warn};

use crate::compare::{parse_number, ComparisonRow, Winner};
use crate::results::Metric;
use crate::sources::short_label;
use crate::summary::ComparisonSummary;

pub const CALCITE: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
pub const NON_CALCITE: RGBColor = RGBColor(0xA2, 0x3B, 0x72);
const TIE: RGBColor = RGBColor(0x9E, 0x9E, 0x9E);

const FONT: &str = "sans-serif";
const CHART_SIZE: (u32, u32) = (1600, 900);

pub const VISUALIZATIONS_DIR: &str = "visualizations";

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

/// Per-metric bar charts and their file names.
const METRIC_CHARTS: [(Metric, &str, &str, &str); 4] = [
    (Metric::Median, "median_comparison.png", "Median Response Time", "ms"),
    (Metric::P95, "p95_comparison.png", "95th Percentile Response Time", "ms"),
    (Metric::P99, "p99_comparison.png", "99th Percentile Response Time", "ms"),
    (Metric::RequestsPerSec, "requests_per_second.png", "Requests per Second", "req/s"),
];

/// One query's value for each mode.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub label: String,
    pub calcite: f64,
    pub non_calcite: f64,
}

/// Default chart directory next to the comparison file.
pub fn default_output_dir(csv_path: &Path) -> PathBuf {
    match csv_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(VISUALIZATIONS_DIR),
        _ => PathBuf::from(VISUALIZATIONS_DIR),
    }
}

fn query_rows(rows: &[ComparisonRow]) -> impl Iterator<Item = &ComparisonRow> {
    rows.iter().filter(|r| !r.is_aggregated())
}

fn value_or_zero(raw: &str, query: &str, column: &str) -> f64 {
    parse_number(raw).unwrap_or_else(|| {
        warn!("Non-numeric {} '{}' for '{}', plotting as 0", column, raw, query);
        0.0
    })
}

/// Values of one metric for every query row.
pub fn metric_series(rows: &[ComparisonRow], metric: Metric) -> Vec<MetricPoint> {
    query_rows(rows)
        .map(|row| MetricPoint {
            label: short_label(&row.query_name).to_string(),
            calcite: value_or_zero(row.calcite(metric), &row.query_name, metric.label()),
            non_calcite: value_or_zero(row.non_calcite(metric), &row.query_name, metric.label()),
        })
        .collect()
}

/// Signed improvement: negative when Calcite wins, positive when Non-Calcite wins.
pub fn improvement_value(row: &ComparisonRow) -> Option<f64> {
    match row.winner() {
        Winner::Calcite => row.improvement_percent().map(|v| -v),
        Winner::NonCalcite => row.improvement_percent(),
        Winner::Equal => Some(0.0),
        Winner::Unknown => None,
    }
}

/// Text block for the aggregated chart, computed from the rows.
pub fn summary_lines(summary: &ComparisonSummary) -> Vec<String> {
    let mut lines = vec![
        format!("Queries compared: {}", summary.compared),
        format!(
            "Calcite faster: {} ({:.1}%)",
            summary.calcite_wins,
            summary.calcite_win_percent()
        ),
        format!(
            "Non-Calcite faster: {} ({:.1}%)",
            summary.non_calcite_wins,
            summary.non_calcite_win_percent()
        ),
        format!("Equal: {}", summary.ties),
    ];
    if summary.undecided > 0 {
        lines.push(format!("Not comparable: {}", summary.undecided));
    }
    if let Some(agg) = &summary.aggregated {
        lines.push(String::new());
        lines.push(format!(
            "Average: {} ms vs {} ms ({})",
            agg.calcite_average, agg.non_calcite_average, agg.average_change
        ));
        lines.push(format!(
            "Median: {} ms vs {} ms ({})",
            agg.calcite_median, agg.non_calcite_median, agg.median_change
        ));
        lines.push(format!(
            "Requests/s: {} vs {} ({})",
            agg.calcite_rps, agg.non_calcite_rps, agg.rps_change
        ));
        lines.push(format!("Overall: {} ({})", agg.winner, agg.improvement));
    }
    lines
}

/// Render every chart into `out_dir`, returning the written files.
pub fn render_all(rows: &[ComparisonRow], out_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let mut written = Vec::new();

    let (median, median_file, median_title, median_unit) = METRIC_CHARTS[0];
    let path = out_dir.join(median_file);
    draw(&path, |p| grouped_bars(p, median_title, median_unit, &metric_series(rows, median)))?;
    written.push(path);

    let path = out_dir.join("performance_improvement.png");
    draw(&path, |p| improvement_chart(p, rows))?;
    written.push(path);

    for (metric, file, title, unit) in &METRIC_CHARTS[1..] {
        let path = out_dir.join(file);
        draw(&path, |p| grouped_bars(p, title, unit, &metric_series(rows, *metric)))?;
        written.push(path);
    }

    let summary = ComparisonSummary::from_rows(rows);
    let path = out_dir.join("winner_summary.png");
    draw(&path, |p| winner_summary(p, rows, &summary))?;
    written.push(path);

    if let Some(aggregated) = rows.iter().find(|r| r.is_aggregated()) {
        let path = out_dir.join("aggregated_summary.png");
        draw(&path, |p| aggregated_summary(p, aggregated, &summary))?;
        written.push(path);
    }

    Ok(written)
}

fn draw<F>(path: &Path, render: F) -> Result<()>
where
    F: FnOnce(&Path) -> DrawResult,
{
    render(path).map_err(|e| Error::Render(format!("{}: {e}", path.display())))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn label_at(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn upper_bound(max: f64) -> f64 {
    if max > 0.0 {
        max * 1.15
    } else {
        1.0
    }
}

fn grouped_bars(path: &Path, title: &str, unit: &str, points: &[MetricPoint]) -> DrawResult {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<String> = points.iter().map(|p| p.label.clone()).collect();
    let n = points.len().max(1);
    let max = points
        .iter()
        .flat_map(|p| [p.calcite, p.non_calcite])
        .fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{title}: Calcite vs Non-Calcite"), (FONT, 30))
        .margin(20)
        .x_label_area_size(220)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..upper_bound(max))?;

    let formatter = |x: &f64| label_at(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&formatter)
        .x_label_style((FONT, 13).into_font().transform(FontTransform::Rotate90))
        .y_desc(unit)
        .draw()?;

    chart
        .draw_series(points.iter().enumerate().map(|(i, p)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x, p.calcite)], CALCITE.filled())
        }))?
        .label("Calcite")
        .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], CALCITE.filled()));

    chart
        .draw_series(points.iter().enumerate().map(|(i, p)| {
            let x = i as f64;
            Rectangle::new([(x, 0.0), (x + 0.4, p.non_calcite)], NON_CALCITE.filled())
        }))?
        .label("Non-Calcite")
        .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], NON_CALCITE.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn improvement_chart(path: &Path, rows: &[ComparisonRow]) -> DrawResult {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut labels = Vec::new();
    let mut values = Vec::new();
    for row in query_rows(rows) {
        labels.push(short_label(&row.query_name).to_string());
        values.push(improvement_value(row).unwrap_or_else(|| {
            warn!("No improvement value for '{}', plotting as 0", row.query_name);
            0.0
        }));
    }

    let n = values.len().max(1);
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let lower = if min < 0.0 { min * 1.15 } else { -1.0 };

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Performance Improvement (negative: Calcite faster, positive: Non-Calcite faster)",
            (FONT, 26),
        )
        .margin(20)
        .x_label_area_size(220)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), lower..upper_bound(max))?;

    let formatter = |x: &f64| label_at(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n + 1)
        .x_label_formatter(&formatter)
        .x_label_style((FONT, 13).into_font().transform(FontTransform::Rotate90))
        .y_desc("Improvement (%)")
        .draw()?;

    chart.draw_series(values.iter().enumerate().map(|(i, v)| {
        let x = i as f64;
        let color = if *v < 0.0 { CALCITE } else { NON_CALCITE };
        Rectangle::new([(x - 0.35, 0.0), (x + 0.35, *v)], color.filled())
    }))?;

    chart.draw_series(LineSeries::new(
        [(-0.5, 0.0), (n as f64 - 0.5, 0.0)],
        BLACK.stroke_width(1),
    ))?;

    root.present()?;
    Ok(())
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn winner_summary(path: &Path, rows: &[ComparisonRow], summary: &ComparisonSummary) -> DrawResult {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Calcite vs Non-Calcite: Winner Summary", (FONT, 32))?;
    let (left, right) = root.split_horizontally(CHART_SIZE.0 as i32 / 2);

    let slices: Vec<(String, f64, RGBColor)> = [
        ("Calcite", summary.calcite_wins, CALCITE),
        ("Non-Calcite", summary.non_calcite_wins, NON_CALCITE),
        ("Equal", summary.ties, TIE),
    ]
    .into_iter()
    .filter(|(_, count, _)| *count > 0)
    .map(|(label, count, color)| (format!("{label} ({count})"), count as f64, color))
    .collect();

    if slices.is_empty() {
        left.draw(&Text::new(
            "No decided queries",
            (CHART_SIZE.0 as i32 / 6, CHART_SIZE.1 as i32 / 3),
            (FONT, 24).into_font(),
        ))?;
    } else {
        let labels: Vec<String> = slices.iter().map(|s| s.0.clone()).collect();
        let sizes: Vec<f64> = slices.iter().map(|s| s.1).collect();
        let colors: Vec<RGBColor> = slices.iter().map(|s| s.2).collect();
        let (w, h) = left.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(w.min(h)) * 0.35;

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style((FONT, 20).into_font());
        pie.percentages((FONT, 18).into_font().color(&WHITE));
        left.draw(&pie)?;
    }

    let calcite_gains: Vec<f64> = query_rows(rows)
        .filter(|r| r.winner() == Winner::Calcite)
        .filter_map(|r| r.improvement_percent())
        .collect();
    let non_calcite_gains: Vec<f64> = query_rows(rows)
        .filter(|r| r.winner() == Winner::NonCalcite)
        .filter_map(|r| r.improvement_percent())
        .collect();
    let bars = [
        ("Calcite", mean(&calcite_gains), CALCITE),
        ("Non-Calcite", mean(&non_calcite_gains), NON_CALCITE),
    ];
    let max = bars.iter().map(|b| b.1).fold(0.0_f64, f64::max);
    let labels: Vec<String> = bars.iter().map(|b| b.0.to_string()).collect();

    let mut chart = ChartBuilder::on(&right)
        .caption("Average improvement when faster", (FONT, 22))
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..1.5, 0.0..upper_bound(max))?;

    let formatter = |x: &f64| label_at(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(3)
        .x_label_formatter(&formatter)
        .y_desc("Improvement (%)")
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value, color))| {
        let x = i as f64;
        Rectangle::new([(x - 0.3, 0.0), (x + 0.3, *value)], color.filled())
    }))?;

    root.present()?;
    Ok(())
}

fn aggregated_summary(
    path: &Path,
    aggregated: &ComparisonRow,
    summary: &ComparisonSummary,
) -> DrawResult {
    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("Aggregated Performance Summary", (FONT, 32))?;
    let (left, right) = root.split_horizontally(CHART_SIZE.0 as i32 * 3 / 5);

    let metrics = [Metric::Average, Metric::Median, Metric::P95, Metric::P99];
    let points: Vec<MetricPoint> = metrics
        .iter()
        .map(|m| MetricPoint {
            label: m.label().to_string(),
            calcite: value_or_zero(aggregated.calcite(*m), &aggregated.query_name, m.label()),
            non_calcite: value_or_zero(
                aggregated.non_calcite(*m),
                &aggregated.query_name,
                m.label(),
            ),
        })
        .collect();
    let labels: Vec<String> = points.iter().map(|p| p.label.clone()).collect();
    let max = points
        .iter()
        .flat_map(|p| [p.calcite, p.non_calcite])
        .fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(&left)
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(points.len() as f64 - 0.5), 0.0..upper_bound(max))?;

    let formatter = |x: &f64| label_at(&labels, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(points.len() + 1)
        .x_label_formatter(&formatter)
        .y_desc("Response time (ms)")
        .draw()?;

    chart
        .draw_series(points.iter().enumerate().map(|(i, p)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x, p.calcite)], CALCITE.filled())
        }))?
        .label("Calcite")
        .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], CALCITE.filled()));
    chart
        .draw_series(points.iter().enumerate().map(|(i, p)| {
            let x = i as f64;
            Rectangle::new([(x, 0.0), (x + 0.4, p.non_calcite)], NON_CALCITE.filled())
        }))?
        .label("Non-Calcite")
        .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], NON_CALCITE.filled()));
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    for (i, line) in summary_lines(summary).iter().enumerate() {
        right.draw(&Text::new(
            line.clone(),
            (20, 80 + i as i32 * 36),
            (FONT, 22).into_font(),
        ))?;
    }

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare_tables;
    use crate::results::{ResultTable, AGGREGATED};
    use std::collections::HashMap;

    fn rows() -> Vec<ComparisonRow> {
        let table = |rows: &[(&str, &str, &str)]| {
            ResultTable::from_rows(rows.iter().map(|(name, median, avg)| {
                HashMap::from([
                    ("Name".to_string(), name.to_string()),
                    ("Median Response Time".to_string(), median.to_string()),
                    ("Average Response Time".to_string(), avg.to_string()),
                ])
            }))
        };
        let calcite = table(&[
            ("PPL Query: vpc/fast", "10", "12"),
            ("PPL Query: vpc/slow", "30", "20"),
            ("DSL Query: vpc/broken", "n/a", "x"),
            (AGGREGATED, "15", "16"),
        ]);
        let non_calcite = table(&[
            ("PPL Query: vpc/fast", "20", "15"),
            ("PPL Query: vpc/slow", "10", "10"),
            ("DSL Query: vpc/broken", "5", "5"),
            (AGGREGATED, "12", "20"),
        ]);
        compare_tables(&calcite, &non_calcite, None).rows
    }

    #[test]
    fn test_metric_series_uses_short_labels_and_zero_for_text() {
        let series = metric_series(&rows(), Metric::Median);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].label, "broken");
        assert_eq!(series[0].calcite, 0.0);
        assert_eq!(series[0].non_calcite, 5.0);
        assert_eq!(series[1].label, "fast");
        assert_eq!(series[1].calcite, 10.0);
    }

    #[test]
    fn test_improvement_sign_follows_winner() {
        let rows = rows();
        let by_name = |name: &str| rows.iter().find(|r| r.query_name == name).unwrap();
        assert_eq!(improvement_value(by_name("PPL Query: vpc/fast")), Some(-20.0));
        assert_eq!(improvement_value(by_name("PPL Query: vpc/slow")), Some(50.0));
        assert_eq!(improvement_value(by_name("DSL Query: vpc/broken")), None);
    }

    #[test]
    fn test_summary_lines_are_computed() {
        let summary = ComparisonSummary::from_rows(&rows());
        let lines = summary_lines(&summary);
        assert_eq!(lines[0], "Queries compared: 3");
        assert_eq!(lines[1], "Calcite faster: 1 (33.3%)");
        assert_eq!(lines[2], "Non-Calcite faster: 1 (33.3%)");
        assert!(lines.contains(&"Not comparable: 1".to_string()));
        assert!(lines.contains(&"Overall: Calcite (20.00% faster)".to_string()));
    }

    #[test]
    fn test_render_all_writes_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("visualizations");
        let written = render_all(&rows(), &out_dir).unwrap();

        assert_eq!(written.len(), 7);
        for file in [
            "median_comparison.png",
            "performance_improvement.png",
            "p95_comparison.png",
            "p99_comparison.png",
            "requests_per_second.png",
            "winner_summary.png",
            "aggregated_summary.png",
        ] {
            let path = out_dir.join(file);
            assert!(written.contains(&path), "{file} not reported");
            assert!(std::fs::metadata(&path).unwrap().len() > 0, "{file} is empty");
        }
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("results/waf/comparison.csv")),
            PathBuf::from("results/waf/visualizations")
        );
        assert_eq!(
            default_output_dir(Path::new("comparison.csv")),
            PathBuf::from("visualizations")
        );
    }
}
