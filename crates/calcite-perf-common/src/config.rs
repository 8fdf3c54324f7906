//! Cluster connection settings read from the environment.
//!
//! All tools share one set of variables. Each tool states which of them it
//! requires through [`EnvRequirements`]; validation reports every missing
//! variable at once and happens before any HTTP client is built.

use std::fmt;

use crate::error::{Error, Result};

pub const ENDPOINT_VAR: &str = "OPENSEARCH_ENDPOINT";
pub const USER_VAR: &str = "OPENSEARCH_USER";
pub const PASSWORD_VAR: &str = "OPENSEARCH_PASSWORD";
pub const INDEX_VAR: &str = "INDEX_NAME";

/// Human readable description of a known environment variable.
pub fn describe_env_var(name: &str) -> &'static str {
    match name {
        ENDPOINT_VAR => "OpenSearch cluster endpoint URL",
        USER_VAR => "Username for authentication",
        PASSWORD_VAR => "Password for authentication",
        INDEX_VAR => "Target index name for data ingestion",
        _ => "required setting",
    }
}

/// Which optional variables a tool treats as mandatory.
///
/// The endpoint is always required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvRequirements {
    pub credentials: bool,
    pub index: bool,
}

impl EnvRequirements {
    /// Generators that always authenticate (VPC, NFW, WAF).
    pub const AUTHENTICATED_INGEST: Self = Self {
        credentials: true,
        index: true,
    };

    /// Ingestion where credentials are optional (CloudTrail, NDJSON files).
    pub const OPTIONAL_AUTH_INGEST: Self = Self {
        credentials: false,
        index: true,
    };

    /// The load test client only needs somewhere to send queries.
    pub const QUERY_CLIENT: Self = Self {
        credentials: false,
        index: false,
    };
}

/// HTTP basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for the target cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Base URL without trailing slash
    pub endpoint: String,
    pub credentials: Option<Credentials>,
    pub index: Option<String>,
}

impl ClusterConfig {
    /// Read the configuration from the process environment.
    pub fn from_env(requirements: EnvRequirements) -> Result<Self> {
        Self::from_lookup(requirements, |name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(requirements: EnvRequirements, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = get(ENDPOINT_VAR);
        let username = get(USER_VAR);
        let password = get(PASSWORD_VAR);
        let index = get(INDEX_VAR);

        let mut missing = Vec::new();
        if endpoint.is_none() {
            missing.push(ENDPOINT_VAR.to_string());
        }
        if requirements.credentials {
            if username.is_none() {
                missing.push(USER_VAR.to_string());
            }
            if password.is_none() {
                missing.push(PASSWORD_VAR.to_string());
            }
        }
        if requirements.index && index.is_none() {
            missing.push(INDEX_VAR.to_string());
        }
        if !missing.is_empty() {
            return Err(Error::MissingEnv(missing));
        }

        let endpoint = endpoint.unwrap_or_default();
        let endpoint = endpoint.trim().trim_end_matches('/').to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(Error::Configuration(format!(
                "{ENDPOINT_VAR} must start with http:// or https://, got '{endpoint}'"
            )));
        }

        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        Ok(Self {
            endpoint,
            credentials,
            index,
        })
    }

    /// Join a path onto the endpoint.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    /// Target index, failing when the tool was configured without one.
    pub fn index(&self) -> Result<&str> {
        self.index
            .as_deref()
            .ok_or_else(|| Error::MissingEnv(vec![INDEX_VAR.to_string()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_endpoint_is_reported() {
        let err = ClusterConfig::from_lookup(
            EnvRequirements::QUERY_CLIENT,
            lookup(&[("INDEX_NAME", "logs")]),
        )
        .unwrap_err();
        match err {
            Error::MissingEnv(vars) => assert_eq!(vars, vec!["OPENSEARCH_ENDPOINT".to_string()]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_all_missing_variables_listed_together() {
        let err = ClusterConfig::from_lookup(EnvRequirements::AUTHENTICATED_INGEST, lookup(&[]))
            .unwrap_err();
        match err {
            Error::MissingEnv(vars) => assert_eq!(
                vars,
                vec![
                    "OPENSEARCH_ENDPOINT",
                    "OPENSEARCH_USER",
                    "OPENSEARCH_PASSWORD",
                    "INDEX_NAME"
                ]
            ),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let err = ClusterConfig::from_lookup(
            EnvRequirements::OPTIONAL_AUTH_INGEST,
            lookup(&[("OPENSEARCH_ENDPOINT", "http://localhost:9200"), ("INDEX_NAME", "  ")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingEnv(ref v) if v == &vec!["INDEX_NAME".to_string()]));
    }

    #[test]
    fn test_optional_credentials() {
        let config = ClusterConfig::from_lookup(
            EnvRequirements::OPTIONAL_AUTH_INGEST,
            lookup(&[
                ("OPENSEARCH_ENDPOINT", "http://localhost:9200/"),
                ("INDEX_NAME", "cloudtrail"),
                ("OPENSEARCH_USER", "admin"),
            ]),
        )
        .unwrap();
        assert_eq!(config.endpoint, "http://localhost:9200");
        assert!(config.credentials.is_none());
        assert_eq!(config.index().unwrap(), "cloudtrail");
        assert_eq!(config.url("/_bulk"), "http://localhost:9200/_bulk");
    }

    #[test]
    fn test_rejects_endpoint_without_scheme() {
        let err = ClusterConfig::from_lookup(
            EnvRequirements::QUERY_CLIENT,
            lookup(&[("OPENSEARCH_ENDPOINT", "localhost:9200")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }
}
