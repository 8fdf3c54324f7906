//! HTTP client for one simulated user.

use std::time::{Duration, Instant};

use calcite_perf_common::{ClusterConfig, Credentials, Error, Result};
use reqwest::{Client, StatusCode};

use crate::queries::{Query, QueryKind};

/// Result of sending one query.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub name: String,
    pub elapsed: Duration,
    /// Response body size in bytes
    pub content_length: u64,
    /// `None` on HTTP 200
    pub error: Option<String>,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Sends PPL and DSL queries; one per simulated user.
#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    endpoint: String,
    credentials: Option<Credentials>,
    index: Option<String>,
}

impl QueryClient {
    pub fn new(cluster: &ClusterConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: cluster.endpoint.clone(),
            credentials: cluster.credentials.clone(),
            index: cluster.index.clone(),
        })
    }

    /// Endpoint a query is posted to.
    pub fn url_for(&self, kind: QueryKind) -> String {
        match (kind, &self.index) {
            (QueryKind::Ppl, _) => format!("{}/_plugins/_ppl", self.endpoint),
            (QueryKind::Dsl, Some(index)) => format!("{}/{}/_search", self.endpoint, index),
            (QueryKind::Dsl, None) => format!("{}/_search", self.endpoint),
        }
    }

    /// Send a query. Only HTTP 200 counts as success; nothing here fails.
    pub async fn execute(&self, query: &Query) -> RequestOutcome {
        let mut request = self
            .client
            .post(self.url_for(query.kind()))
            .json(&query.payload());
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let start = Instant::now();
        let (content_length, error) = match request.send().await {
            Ok(response) => {
                let status = response.status();
                let length = response.bytes().await.map(|b| b.len() as u64).unwrap_or(0);
                if status == StatusCode::OK {
                    (length, None)
                } else {
                    (length, Some(format!("Got status code {}", status.as_u16())))
                }
            }
            Err(e) => (0, Some(format!("Request failed: {e}"))),
        };

        RequestOutcome {
            name: query.name.clone(),
            elapsed: start.elapsed(),
            content_length,
            error,
        }
    }
}
