//! Bulk indexing client.
//!
//! Documents are sent as NDJSON action/document pairs to `_bulk`. Each worker
//! owns its own [`BulkClient`] so connection pools are never shared.

use std::time::Duration;

use calcite_perf_common::{ClusterConfig, Credentials, Error, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Configuration for the bulk client
#[derive(Debug, Clone)]
pub struct BulkClientConfig {
    /// Base URL of the cluster, without trailing slash
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub credentials: Option<Credentials>,
    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl Default for BulkClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9200".to_string(),
            timeout: Duration::from_secs(30),
            credentials: None,
            accept_invalid_certs: false,
        }
    }
}

impl From<&ClusterConfig> for BulkClientConfig {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            base_url: config.endpoint.clone(),
            credentials: config.credentials.clone(),
            ..Self::default()
        }
    }
}

/// Retry schedule for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay after the given failed attempt (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// One entry of the bulk response `items` array.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkItem {
    #[serde(alias = "create", alias = "update", alias = "delete")]
    pub index: BulkItemResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkItemResult {
    pub status: u16,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Parsed `_bulk` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkResponse {
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// The first per-item error reported by the cluster, if any.
    pub fn first_error(&self) -> Option<&Value> {
        self.items.iter().find_map(|item| item.index.error.as_ref())
    }

    /// Items acknowledged with 200 or 201.
    pub fn successful_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.index.status, 200 | 201))
            .count()
    }
}

/// Serialize documents as `_bulk` NDJSON, one index action per document.
pub fn build_bulk_body(index: &str, documents: &[Value]) -> String {
    let action = json!({ "index": { "_index": index } }).to_string();
    let mut body = String::with_capacity(documents.len() * 512);
    for doc in documents {
        body.push_str(&action);
        body.push('\n');
        body.push_str(&doc.to_string());
        body.push('\n');
    }
    body
}

/// HTTP client for `_bulk`, `_refresh` and `_count`.
#[derive(Clone)]
pub struct BulkClient {
    client: Client,
    config: BulkClientConfig,
}

impl BulkClient {
    pub fn new(config: BulkClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn apply_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.password)),
            None => request,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path.trim_start_matches('/'))
    }

    /// Send one bulk request.
    ///
    /// Any status other than 200/201 is an error. An `errors: true` body is
    /// returned as-is so callers can inspect per-item statuses.
    pub async fn bulk_index(&self, index: &str, documents: &[Value]) -> Result<BulkResponse> {
        let body = build_bulk_body(index, documents);
        let request = self
            .client
            .post(self.url("_bulk?refresh=false"))
            .header("Content-Type", "application/x-ndjson")
            .body(body);

        let response = self.apply_auth(request).send().await?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(Error::Http(format!("HTTP {status}: {snippet}")));
        }

        Ok(response.json::<BulkResponse>().await?)
    }

    /// Index a batch, retrying per `policy`.
    ///
    /// Returns `true` once an attempt is accepted with `errors: false`.
    pub async fn index_with_retry(
        &self,
        index: &str,
        documents: &[Value],
        policy: RetryPolicy,
    ) -> bool {
        for attempt in 1..=policy.max_attempts {
            match self.bulk_index(index, documents).await {
                Ok(resp) if !resp.errors => return true,
                Ok(resp) => {
                    let detail = resp
                        .first_error()
                        .map(Value::to_string)
                        .unwrap_or_else(|| "unknown item error".to_string());
                    warn!(
                        "Bulk response reported errors (attempt {}/{}): {}",
                        attempt, policy.max_attempts, detail
                    );
                }
                Err(e) => {
                    warn!(
                        "Bulk request failed (attempt {}/{}): {}",
                        attempt, policy.max_attempts, e
                    );
                }
            }

            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }
        false
    }

    /// Make indexed documents visible to search.
    pub async fn refresh(&self, index: &str) -> Result<()> {
        let request = self.client.post(self.url(&format!("{index}/_refresh")));
        let response = self.apply_auth(request).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "refresh of '{index}' returned HTTP {}",
                response.status()
            )));
        }
        debug!("Refreshed index {}", index);
        Ok(())
    }

    /// Document count of an index.
    pub async fn count(&self, index: &str) -> Result<u64> {
        let request = self.client.get(self.url(&format!("{index}/_count")));
        let response = self.apply_auth(request).send().await?;
        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "count of '{index}' returned HTTP {}",
                response.status()
            )));
        }
        let body: Value = response.json().await?;
        body.get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Serialization(format!("missing 'count' in response: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_body_pairs_actions_with_documents() {
        let docs = vec![json!({"a": 1}), json!({"b": "x"})];
        let body = build_bulk_body("logs", &docs);
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], r#"{"index":{"_index":"logs"}}"#);
        assert_eq!(lines[1], r#"{"a":1}"#);
        assert_eq!(lines[3], r#"{"b":"x"}"#);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
    }

    #[test]
    fn test_bulk_response_item_statuses() {
        let resp: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"status": 201}},
                {"create": {"status": 200}},
                {"index": {"status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        }))
        .unwrap();
        assert_eq!(resp.successful_items(), 2);
        assert_eq!(
            resp.first_error().unwrap()["type"],
            "mapper_parsing_exception"
        );
    }

    #[test]
    fn test_config_from_cluster() {
        let cluster = ClusterConfig {
            endpoint: "https://search.local:9200".to_string(),
            credentials: None,
            index: Some("logs".to_string()),
        };
        let config = BulkClientConfig::from(&cluster);
        assert_eq!(config.base_url, "https://search.local:9200");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.accept_invalid_certs);
    }
}
