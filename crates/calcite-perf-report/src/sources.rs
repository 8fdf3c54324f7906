//! Lookup of the query text behind a request name.
//!
//! `PPL Query: vpc/top_talkers` resolves to `<dir>/ppl/vpc/top_talkers.ppl`,
//! `DSL Query: vpc/match_all` to `<dir>/dsl/vpc/match_all.json`. Names without
//! a prefix are treated as PPL.

use std::fs;
use std::path::{Path, PathBuf};

use calcite_perf_common::LogType;
use tracing::{debug, info};

pub const PPL_PREFIX: &str = "PPL Query:";
pub const DSL_PREFIX: &str = "DSL Query:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Ppl,
    Dsl,
}

impl SourceKind {
    fn dir_name(&self) -> &'static str {
        match self {
            SourceKind::Ppl => "ppl",
            SourceKind::Dsl => "dsl",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            SourceKind::Ppl => "ppl",
            SourceKind::Dsl => "json",
        }
    }
}

/// Split a request name into its query kind and file stem.
///
/// The display prefix and any `<log_type>/` directory are dropped.
pub fn parse_query_name(name: &str) -> (SourceKind, &str) {
    let (kind, rest) = if let Some(rest) = name.strip_prefix(PPL_PREFIX) {
        (SourceKind::Ppl, rest)
    } else if let Some(rest) = name.strip_prefix(DSL_PREFIX) {
        (SourceKind::Dsl, rest)
    } else {
        (SourceKind::Ppl, name)
    };
    let rest = rest.trim();
    let stem = rest.rsplit('/').next().unwrap_or(rest);
    (kind, stem)
}

/// Short chart label for a request name.
pub fn short_label(name: &str) -> &str {
    parse_query_name(name).1
}

/// Directories searched for query sources, in priority order.
pub fn candidate_roots(queries_dir: Option<&Path>, calcite_file: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(dir) = queries_dir {
        roots.push(dir.to_path_buf());
    }
    let parent = calcite_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    roots.push(parent.join(".."));
    roots.push(PathBuf::from("."));
    roots
}

/// Resolves request names to query text for one log type.
#[derive(Debug, Clone, Default)]
pub struct QuerySourceResolver {
    ppl_dir: Option<PathBuf>,
    dsl_dir: Option<PathBuf>,
}

impl QuerySourceResolver {
    /// Pick, per query kind, the first root holding a `<kind>/<log_type>` dir.
    pub fn discover(log_type: LogType, roots: &[PathBuf]) -> Self {
        let find = |kind: SourceKind| {
            roots
                .iter()
                .map(|root| root.join(kind.dir_name()).join(log_type.as_str()))
                .find(|dir| dir.is_dir())
        };
        let resolver = Self {
            ppl_dir: find(SourceKind::Ppl),
            dsl_dir: find(SourceKind::Dsl),
        };
        if let Some(dir) = &resolver.ppl_dir {
            info!("Found PPL queries in: {}", dir.display());
        }
        if let Some(dir) = &resolver.dsl_dir {
            info!("Found DSL queries in: {}", dir.display());
        }
        resolver
    }

    pub fn with_dirs(ppl_dir: Option<PathBuf>, dsl_dir: Option<PathBuf>) -> Self {
        Self { ppl_dir, dsl_dir }
    }

    /// No source directory was found.
    pub fn is_empty(&self) -> bool {
        self.ppl_dir.is_none() && self.dsl_dir.is_none()
    }

    /// Query text for a request name, trimmed.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let (kind, stem) = parse_query_name(name);
        let dir = match kind {
            SourceKind::Ppl => self.ppl_dir.as_ref(),
            SourceKind::Dsl => self.dsl_dir.as_ref(),
        }?;
        let path = dir.join(format!("{stem}.{}", kind.extension()));
        match fs::read_to_string(&path) {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                debug!("No query source at {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_name() {
        assert_eq!(
            parse_query_name("PPL Query: vpc/01_count_all"),
            (SourceKind::Ppl, "01_count_all")
        );
        assert_eq!(
            parse_query_name("DSL Query: waf/blocked"),
            (SourceKind::Dsl, "blocked")
        );
        assert_eq!(parse_query_name("01_count_all"), (SourceKind::Ppl, "01_count_all"));
        assert_eq!(short_label("PPL Query: cloudtrail/top_users"), "top_users");
    }

    #[test]
    fn test_candidate_roots() {
        let roots = candidate_roots(
            Some(Path::new("/q")),
            Path::new("results/vpc/calcite_vpc_stats.csv"),
        );
        assert_eq!(
            roots,
            vec![
                PathBuf::from("/q"),
                PathBuf::from("results/vpc/.."),
                PathBuf::from(".")
            ]
        );

        let roots = candidate_roots(None, Path::new("stats.csv"));
        assert_eq!(roots[0], PathBuf::from("./.."));
    }

    #[test]
    fn test_resolve_from_discovered_dirs() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("ppl/vpc")).unwrap();
        fs::create_dir_all(root.path().join("dsl/vpc")).unwrap();
        fs::write(root.path().join("ppl/vpc/count.ppl"), "source = vpc | stats count()\n").unwrap();
        fs::write(root.path().join("dsl/vpc/size0.json"), "{\"size\": 0}").unwrap();

        let missing = root.path().join("nowhere");
        let resolver =
            QuerySourceResolver::discover(LogType::Vpc, &[missing, root.path().to_path_buf()]);
        assert!(!resolver.is_empty());
        assert_eq!(
            resolver.resolve("PPL Query: vpc/count").as_deref(),
            Some("source = vpc | stats count()")
        );
        assert_eq!(
            resolver.resolve("DSL Query: vpc/size0").as_deref(),
            Some("{\"size\": 0}")
        );
        assert_eq!(resolver.resolve("PPL Query: vpc/absent"), None);
    }

    #[test]
    fn test_empty_resolver() {
        let resolver = QuerySourceResolver::default();
        assert!(resolver.is_empty());
        assert_eq!(resolver.resolve("PPL Query: vpc/count"), None);
    }
}
