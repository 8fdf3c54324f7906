//! Per-mode load test result tables.

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use calcite_perf_common::{Error, Result};

/// Name of the all-requests row.
pub const AGGREGATED: &str = "Aggregated";

pub const NAME_COLUMN: &str = "Name";
pub const REQUEST_COUNT_COLUMN: &str = "Request Count";
pub const FAILURE_COUNT_COLUMN: &str = "Failure Count";

/// Metrics that get a percentage-change column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Median,
    Average,
    Min,
    Max,
    P95,
    P99,
    RequestsPerSec,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Median,
        Metric::Average,
        Metric::Min,
        Metric::Max,
        Metric::P95,
        Metric::P99,
        Metric::RequestsPerSec,
    ];

    /// Column in the input result table.
    pub fn column(&self) -> &'static str {
        match self {
            Metric::Median => "Median Response Time",
            Metric::Average => "Average Response Time",
            Metric::Min => "Min Response Time",
            Metric::Max => "Max Response Time",
            Metric::P95 => "95%",
            Metric::P99 => "99%",
            Metric::RequestsPerSec => "Requests/s",
        }
    }

    /// Short name for charts and console output.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Median => "Median",
            Metric::Average => "Average",
            Metric::Min => "Min",
            Metric::Max => "Max",
            Metric::P95 => "95%",
            Metric::P99 => "99%",
            Metric::RequestsPerSec => "Requests/s",
        }
    }
}

/// One result table, rows keyed by request name.
///
/// Rows are kept as opaque column/value maps; nothing is parsed until a
/// value is compared. A repeated name keeps its last row.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    rows: BTreeMap<String, HashMap<String, String>>,
}

impl ResultTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        if !headers.iter().any(|h| h == NAME_COLUMN) {
            return Err(Error::InvalidInput(format!(
                "result table has no '{NAME_COLUMN}' column"
            )));
        }

        let mut rows = BTreeMap::new();
        for record in reader.records() {
            let record = record?;
            let row: HashMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();
            if let Some(name) = row.get(NAME_COLUMN).cloned() {
                rows.insert(name, row);
            }
        }
        Ok(Self { rows })
    }

    /// Build a table from in-memory rows.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = HashMap<String, String>>,
    {
        let rows = rows
            .into_iter()
            .filter_map(|row| row.get(NAME_COLUMN).cloned().map(|name| (name, row)))
            .collect();
        Self { rows }
    }

    /// Request names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rows.contains_key(name)
    }

    pub fn get(&self, name: &str, column: &str) -> Option<&str> {
        self.rows
            .get(name)
            .and_then(|row| row.get(column))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCUST_CSV: &str = "\
Type,Name,Request Count,Failure Count,Median Response Time,Average Response Time,Min Response Time,Max Response Time,Average Content Size,Requests/s,Failures/s,50%,66%,75%,80%,90%,95%,98%,99%,99.9%,99.99%,100%
POST,PPL Query: vpc/a,10,0,12,13.5,9,20,100,0.5,0,12,13,14,15,17,19,20,20,20,20,20
POST,PPL Query: vpc/a,11,1,14,15.5,9,22,100,0.5,0,12,13,14,15,17,19,20,20,20,20,20
,Aggregated,21,1,13,14.5,9,22,100,1.0,0,12,13,14,15,17,19,20,20,20,20,22
";

    #[test]
    fn test_reads_locust_stats() {
        let table = ResultTable::from_reader(LOCUST_CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["Aggregated", "PPL Query: vpc/a"]
        );
        // last duplicate wins
        assert_eq!(table.get("PPL Query: vpc/a", REQUEST_COUNT_COLUMN), Some("11"));
        assert_eq!(table.get(AGGREGATED, Metric::P95.column()), Some("19"));
        assert_eq!(table.get(AGGREGATED, "Nope"), None);
    }

    #[test]
    fn test_requires_name_column() {
        let err = ResultTable::from_reader("Query,Count\nx,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
