//! One indexing worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use calcite_perf_common::format::rate_per_sec;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::bulk::{BulkClient, RetryPolicy};
use crate::generators::LogGenerator;

/// Per-worker share of a generation run.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub worker_id: usize,
    pub index: String,
    /// Documents this worker generates; the last batch may be short
    pub docs: u64,
    pub batch_size: usize,
    pub max_consecutive_failures: u32,
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
    /// Log a progress line every this many batches
    pub progress_every: u64,
}

/// What one worker achieved before returning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub indexed: u64,
    pub failed_batches: u64,
    pub batches_attempted: u64,
    /// The consecutive-failure threshold was exceeded
    pub stopped_early: bool,
}

/// Generate and index `settings.docs` documents in batches of `batch_size`.
///
/// A batch that fails every retry counts as failed; once more than
/// `max_consecutive_failures` batches fail in a row the worker gives up and
/// returns partial counts. `on_batch` is called with the number of documents
/// after every accepted batch.
pub async fn run_worker<F>(
    client: BulkClient,
    generator: Arc<dyn LogGenerator>,
    settings: WorkerSettings,
    on_batch: F,
) -> WorkerReport
where
    F: Fn(u64),
{
    let mut report = WorkerReport {
        worker_id: settings.worker_id,
        ..WorkerReport::default()
    };
    let mut consecutive_failures = 0u32;
    let started = Instant::now();
    let batch_size = settings.batch_size.max(1) as u64;
    let total_batches = settings.docs.div_ceil(batch_size);
    let mut remaining = settings.docs;

    for batch_num in 0..total_batches {
        let size = remaining.min(batch_size);
        remaining -= size;
        let docs = generator.generate_batch(size as usize);
        report.batches_attempted += 1;

        if client
            .index_with_retry(&settings.index, &docs, settings.retry)
            .await
        {
            report.indexed += docs.len() as u64;
            consecutive_failures = 0;
            on_batch(docs.len() as u64);

            if settings.progress_every > 0 && (batch_num + 1) % settings.progress_every == 0 {
                info!(
                    "Worker {}: {}/{} batches, {} docs",
                    settings.worker_id,
                    batch_num + 1,
                    total_batches,
                    report.indexed
                );
            }
        } else {
            report.failed_batches += 1;
            consecutive_failures += 1;
            warn!(
                "Worker {}: batch {} failed ({} consecutive)",
                settings.worker_id,
                batch_num + 1,
                consecutive_failures
            );
            if consecutive_failures > settings.max_consecutive_failures {
                error!(
                    "Worker {}: stopping after {} consecutive failed batches",
                    settings.worker_id, consecutive_failures
                );
                report.stopped_early = true;
                break;
            }
        }

        if !settings.batch_delay.is_zero() {
            sleep(settings.batch_delay).await;
        }
    }

    let secs = started.elapsed().as_secs_f64();
    let rate = rate_per_sec(report.indexed, secs);
    info!(
        "Worker {} done: {} docs in {:.1}s ({:.0} docs/sec), {} failed batches",
        settings.worker_id, report.indexed, secs, rate, report.failed_batches
    );

    report
}
