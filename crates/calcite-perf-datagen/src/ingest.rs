//! Ingestion of a pre-built NDJSON document file.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use calcite_perf_common::format::{format_number, rate_per_sec};
use calcite_perf_common::{Error, Result};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use crate::bulk::BulkClient;

pub const DEFAULT_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// Settings for one file ingestion.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub path: PathBuf,
    pub index: String,
    pub batch_size: usize,
    /// Pause after each full batch
    pub batch_delay: Duration,
    /// Written into every document's `@timestamp`
    pub timestamp: String,
    /// Log a progress line every this many parsed documents
    pub progress_every: u64,
}

impl IngestOptions {
    pub fn new(path: impl Into<PathBuf>, index: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            index: index.into(),
            batch_size: 1000,
            batch_delay: Duration::from_millis(200),
            timestamp: DEFAULT_TIMESTAMP.to_string(),
            progress_every: 50_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestSummary {
    /// Documents parsed from the file
    pub processed: u64,
    /// Documents the cluster acknowledged
    pub ingested: u64,
    pub invalid_lines: u64,
    pub batches: u64,
    pub failed_batches: u64,
    pub elapsed: Duration,
    pub index_count: Option<u64>,
}

impl IngestSummary {
    pub fn failed(&self) -> u64 {
        self.processed.saturating_sub(self.ingested)
    }
}

/// Parse one line into a timestamped document.
///
/// Blank lines yield `Ok(None)`. Lines that are not a JSON object are errors.
pub fn parse_document(line: &str, timestamp: &str) -> Result<Option<Value>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let mut doc: Value = serde_json::from_str(line)?;
    let obj = doc
        .as_object_mut()
        .ok_or_else(|| Error::InvalidInput("document is not a JSON object".to_string()))?;
    obj.insert("@timestamp".to_string(), Value::String(timestamp.to_string()));
    Ok(Some(doc))
}

/// Stream `options.path` into the index in batches.
///
/// Invalid lines are skipped with a warning. Failed batches are counted and
/// the run continues. Only an unreadable file is an error.
pub async fn ingest_file(client: &BulkClient, options: &IngestOptions) -> Result<IngestSummary> {
    let file = File::open(&options.path)
        .await
        .map_err(|e| Error::NotFound(format!("{}: {e}", options.path.display())))?;
    let mut reader = BufReader::new(file);
    let mut raw = Vec::new();

    let start = Instant::now();
    let mut summary = IngestSummary::default();
    let mut batch = Vec::with_capacity(options.batch_size);
    let mut line_num = 0u64;

    info!("Ingesting {} into '{}'", options.path.display(), options.index);

    loop {
        raw.clear();
        if reader.read_until(b'\n', &mut raw).await? == 0 {
            break;
        }
        line_num += 1;
        let line = match std::str::from_utf8(&raw) {
            Ok(line) => line,
            Err(e) => {
                warn!("Invalid UTF-8 on line {}: {}", line_num, e);
                summary.invalid_lines += 1;
                continue;
            }
        };
        let doc = match parse_document(line, &options.timestamp) {
            Ok(Some(doc)) => doc,
            Ok(None) => continue,
            Err(e) => {
                warn!("Invalid JSON on line {}: {}", line_num, e);
                summary.invalid_lines += 1;
                continue;
            }
        };
        batch.push(doc);
        summary.processed += 1;

        if options.progress_every > 0 && summary.processed % options.progress_every == 0 {
            info!(
                "Processed {} documents... Rate: {:.0} docs/sec",
                format_number(summary.processed),
                rate_per_sec(summary.processed, start.elapsed().as_secs_f64())
            );
        }

        if batch.len() >= options.batch_size {
            send_batch(client, &options.index, &batch, &mut summary).await;
            batch.clear();
            if !options.batch_delay.is_zero() {
                tokio::time::sleep(options.batch_delay).await;
            }
        }
    }

    if !batch.is_empty() {
        send_batch(client, &options.index, &batch, &mut summary).await;
    }
    summary.elapsed = start.elapsed();

    info!(
        "Ingestion complete: {} processed, {} ingested, {} failed, {} batches in {:.1}s ({:.0} docs/sec)",
        format_number(summary.processed),
        format_number(summary.ingested),
        format_number(summary.failed()),
        summary.batches,
        summary.elapsed.as_secs_f64(),
        rate_per_sec(summary.ingested, summary.elapsed.as_secs_f64())
    );

    if let Err(e) = client.refresh(&options.index).await {
        warn!("Refresh failed: {}", e);
    }
    match client.count(&options.index).await {
        Ok(count) => {
            info!("Final index count: {} documents", format_number(count));
            summary.index_count = Some(count);
        }
        Err(e) => warn!("Could not read document count: {}", e),
    }

    Ok(summary)
}

async fn send_batch(client: &BulkClient, index: &str, docs: &[Value], summary: &mut IngestSummary) {
    summary.batches += 1;
    match client.bulk_index(index, docs).await {
        Ok(resp) if !resp.errors => summary.ingested += docs.len() as u64,
        Ok(resp) => {
            let ok = resp.successful_items();
            summary.ingested += ok as u64;
            warn!(
                "Batch {}: {}/{} docs successful",
                summary.batches,
                ok,
                docs.len()
            );
        }
        Err(e) => {
            summary.failed_batches += 1;
            warn!("Batch {} FAILED: {}", summary.batches, e);
        }
    }
}

/// True when `path` looks like a readable NDJSON file.
pub fn is_ndjson_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "ndjson" | "jsonl")
    )
}
