//! End-to-end comparison of two stats files on disk.

use std::fs;
use std::path::Path;

use calcite_perf_common::{Error, LogType};
use calcite_perf_report::sources::candidate_roots;
use calcite_perf_report::{
    compare_tables, read_comparison, write_comparison, ComparisonSummary, QuerySourceResolver,
    ResultTable, Winner, AGGREGATED, NOT_AVAILABLE,
};

const HEADER: &str = "Type,Name,Request Count,Failure Count,Median Response Time,Average Response Time,Min Response Time,Max Response Time,Average Content Size,Requests/s,Failures/s,50%,66%,75%,80%,90%,95%,98%,99%,99.9%,99.99%,100%";

fn write_stats(path: &Path, rows: &[&str]) {
    let mut body = String::from(HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    fs::write(path, body).unwrap();
}

fn setup(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let results = root.join("results");
    fs::create_dir_all(&results).unwrap();
    fs::create_dir_all(root.join("ppl/vpc")).unwrap();
    fs::create_dir_all(root.join("dsl/vpc")).unwrap();
    fs::write(
        root.join("ppl/vpc/top_talkers.ppl"),
        "source=vpc_logs | stats count() by srcaddr\n",
    )
    .unwrap();
    fs::write(root.join("dsl/vpc/match_all.json"), "{\"query\":{\"match_all\":{}}}").unwrap();

    let calcite = results.join("calcite_vpc_stats.csv");
    let baseline = results.join("non_calcite_vpc_stats.csv");
    write_stats(
        &calcite,
        &[
            "POST,PPL Query: vpc/top_talkers,50,0,10,12,5,40,900,2.5,0,10,11,12,13,20,30,35,38,40,40,40",
            "POST,DSL Query: vpc/match_all,50,1,8,9,4,20,500,2.5,0.05,8,9,9,10,12,15,18,19,20,20,20",
            "POST,PPL Query: vpc/calcite_only,5,0,1,1,1,1,10,0.1,0,1,1,1,1,1,1,1,1,1,1,1",
            ",Aggregated,105,1,9,10.5,1,40,650,5.1,0.05,9,10,11,12,15,25,30,35,40,40,40",
        ],
    );
    write_stats(
        &baseline,
        &[
            "POST,PPL Query: vpc/top_talkers,48,0,20,15,6,60,900,2.4,0,20,21,22,23,30,45,50,55,60,60,60",
            "POST,DSL Query: vpc/match_all,50,0,6,9,3,18,500,2.5,0,6,7,7,8,10,12,15,17,18,18,18",
            "POST,PPL Query: vpc/missing_source,5,0,1,1,1,1,10,0.1,0,1,1,1,1,1,1,1,1,1,1,1",
            ",Aggregated,103,0,12,12,3,60,650,5.0,0,12,13,14,15,20,30,40,45,60,60,60",
        ],
    );
    (calcite, baseline)
}

#[test]
fn compares_stats_files_with_query_sources() {
    let dir = tempfile::tempdir().unwrap();
    let (calcite_path, baseline_path) = setup(dir.path());

    let calcite = ResultTable::from_path(&calcite_path).unwrap();
    let baseline = ResultTable::from_path(&baseline_path).unwrap();
    let log_type = LogType::detect(&calcite_path).unwrap();
    assert_eq!(log_type, LogType::Vpc);

    let roots = candidate_roots(None, &calcite_path);
    let resolver = QuerySourceResolver::discover(log_type, &roots);
    assert!(!resolver.is_empty());

    let comparison = compare_tables(&calcite, &baseline, Some(&resolver));
    let names: Vec<&str> = comparison.rows.iter().map(|r| r.query_name.as_str()).collect();
    assert_eq!(
        names,
        vec![AGGREGATED, "DSL Query: vpc/match_all", "PPL Query: vpc/top_talkers"]
    );
    assert_eq!(comparison.calcite_only, vec!["PPL Query: vpc/calcite_only"]);
    assert_eq!(comparison.non_calcite_only, vec!["PPL Query: vpc/missing_source"]);

    let top = &comparison.rows[2];
    assert_eq!(top.query_text, "source=vpc_logs | stats count() by srcaddr");
    assert_eq!(top.median_change, "-50.00%");
    assert_eq!(top.winner(), Winner::Calcite);
    assert_eq!(top.performance_improvement, "20.00% faster");
    assert_eq!(top.calcite_request_count, "50");
    assert_eq!(top.non_calcite_request_count, "48");

    let dsl = &comparison.rows[1];
    assert_eq!(dsl.query_text, "{\"query\":{\"match_all\":{}}}");
    assert_eq!(dsl.better_performance, "Equal");
    assert_eq!(dsl.calcite_failures, "1");

    assert_eq!(comparison.rows[0].query_text, NOT_AVAILABLE);

    let out = dir.path().join("results/calcite_vs_non_calcite_comparison.csv");
    write_comparison(&out, &comparison.rows).unwrap();
    let reread = read_comparison(&out).unwrap();
    assert_eq!(reread, comparison.rows);

    let summary = ComparisonSummary::from_rows(&reread);
    assert_eq!(summary.compared, 2);
    assert_eq!(summary.calcite_wins, 1);
    assert_eq!(summary.ties, 1);
    let agg = summary.aggregated.unwrap();
    assert_eq!(agg.average_change, "-12.50%");
    assert_eq!(agg.rps_change, "2.00%");
}

#[test]
fn missing_stats_file_is_not_found() {
    let err = ResultTable::from_path(Path::new("/nonexistent/calcite.csv")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn table_without_name_column_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "Query,Average Response Time\nq1,10\n").unwrap();
    let err = ResultTable::from_path(&path).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}
