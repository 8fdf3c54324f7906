//! Named query set, loaded once and shared read-only by every user.
//!
//! Layout on disk:
//!
//! ```text
//! <queries-dir>/ppl/<log_type>/<name>.ppl    PPL query text
//! <queries-dir>/dsl/<log_type>/<name>.json   search request body
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use calcite_perf_common::{Error, LogType, Result};
use clap::ValueEnum;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Query language of one query file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    Ppl,
    Dsl,
}

impl QueryKind {
    /// Subdirectory holding this kind of query.
    pub fn dir_name(&self) -> &'static str {
        match self {
            QueryKind::Ppl => "ppl",
            QueryKind::Dsl => "dsl",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            QueryKind::Ppl => "ppl",
            QueryKind::Dsl => "json",
        }
    }

    /// Prefix of request names in reports.
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::Ppl => "PPL Query",
            QueryKind::Dsl => "DSL Query",
        }
    }
}

/// Which query kinds to load (`QUERY_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Ppl,
    Dsl,
    Both,
}

impl QueryType {
    pub fn kinds(&self) -> &'static [QueryKind] {
        match self {
            QueryType::Ppl => &[QueryKind::Ppl],
            QueryType::Dsl => &[QueryKind::Dsl],
            QueryType::Both => &[QueryKind::Ppl, QueryKind::Dsl],
        }
    }
}

/// Log types whose queries are loaded (`LOG_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogSelection {
    /// The four generated log families
    #[default]
    All,
    One(LogType),
}

impl LogSelection {
    pub fn log_types(&self) -> Vec<LogType> {
        match self {
            LogSelection::All => LogType::GENERATED.to_vec(),
            LogSelection::One(log_type) => vec![*log_type],
        }
    }
}

impl fmt::Display for LogSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSelection::All => f.write_str("all"),
            LogSelection::One(log_type) => write!(f, "{log_type}"),
        }
    }
}

impl FromStr for LogSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            Ok(LogSelection::All)
        } else {
            s.parse().map(LogSelection::One)
        }
    }
}

/// What is sent for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryBody {
    Ppl(String),
    Dsl(Value),
}

/// One named query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Report name, e.g. `PPL Query: vpc/top_talkers`
    pub name: String,
    pub log_type: LogType,
    pub body: QueryBody,
}

impl Query {
    pub fn kind(&self) -> QueryKind {
        match self.body {
            QueryBody::Ppl(_) => QueryKind::Ppl,
            QueryBody::Dsl(_) => QueryKind::Dsl,
        }
    }

    /// JSON payload of the HTTP request.
    pub fn payload(&self) -> Value {
        match &self.body {
            QueryBody::Ppl(text) => json!({ "query": text }),
            QueryBody::Dsl(body) => body.clone(),
        }
    }
}

/// Build the report name of a query file.
pub fn query_name(kind: QueryKind, log_type: LogType, stem: &str) -> String {
    format!("{}: {}/{}", kind.label(), log_type, stem)
}

/// Immutable set of queries.
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    queries: Vec<Query>,
}

impl QuerySet {
    pub fn new(queries: Vec<Query>) -> Self {
        Self { queries }
    }

    /// Load queries for the selected log types and kinds.
    ///
    /// Missing directories are skipped; DSL files that are not valid JSON are
    /// skipped with a warning. An empty result is an error.
    pub fn load(root: &Path, selection: LogSelection, query_type: QueryType) -> Result<Self> {
        let mut queries = Vec::new();

        for log_type in selection.log_types() {
            for &kind in query_type.kinds() {
                let dir = root.join(kind.dir_name()).join(log_type.as_str());
                if !dir.is_dir() {
                    debug!("Query directory {} does not exist", dir.display());
                    continue;
                }
                for path in query_files(&dir, kind.extension())? {
                    if let Some(query) = load_query(&path, kind, log_type)? {
                        queries.push(query);
                    }
                }
            }
        }

        if queries.is_empty() {
            let dirs: Vec<String> = query_type
                .kinds()
                .iter()
                .map(|k| format!("{}/{}", k.dir_name(), selection))
                .collect();
            return Err(Error::NotFound(format!(
                "No queries found for log type: {selection}. Please ensure the {} directory exists under {} and contains query files.",
                dirs.join(" or "),
                root.display()
            )));
        }

        info!(
            "Loaded {} queries for log type(s): {} ({:?})",
            queries.len(),
            selection,
            query_type
        );
        Ok(Self { queries })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.iter()
    }

    /// Uniformly random query. `None` only for an empty set.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Query> {
        self.queries.choose(rng)
    }
}

fn query_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some(extension))
        .collect();
    files.sort();
    Ok(files)
}

fn load_query(path: &Path, kind: QueryKind, log_type: LogType) -> Result<Option<Query>> {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return Ok(None);
    };
    let text = fs::read_to_string(path)?;

    let body = match kind {
        QueryKind::Ppl => QueryBody::Ppl(text.trim().to_string()),
        QueryKind::Dsl => match serde_json::from_str::<Value>(&text) {
            Ok(body) => QueryBody::Dsl(body),
            Err(e) => {
                warn!("Skipping invalid DSL query {}: {}", path.display(), e);
                return Ok(None);
            }
        },
    };

    Ok(Some(Query {
        name: query_name(kind, log_type, stem),
        log_type,
        body,
    }))
}
