//! Orchestration of a full generation run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use calcite_perf_common::format::{format_number, rate_per_sec};
use calcite_perf_common::{ClusterConfig, Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::bulk::{BulkClient, BulkClientConfig, RetryPolicy};
use crate::generators::{GeneratorProfile, LogGenerator};
use crate::worker::{run_worker, WorkerReport, WorkerSettings};

/// Index used by the pre-flight connection test.
pub const CONNECTION_TEST_INDEX: &str = "test-index";
const CONNECTION_TEST_DOCS: usize = 10;

/// Shape of one generation run.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    pub index: String,
    pub target_docs: u64,
    pub batch_size: usize,
    pub workers: usize,
    pub max_consecutive_failures: u32,
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
    pub skip_connection_test: bool,
    pub show_progress: bool,
}

impl GenerationPlan {
    /// Plan using a generator's defaults.
    pub fn for_profile(profile: &GeneratorProfile, index: impl Into<String>, target_docs: u64) -> Self {
        Self {
            index: index.into(),
            target_docs,
            batch_size: profile.batch_size,
            workers: profile.workers,
            max_consecutive_failures: profile.max_consecutive_failures,
            batch_delay: profile.batch_delay,
            retry: RetryPolicy::default(),
            skip_connection_test: false,
            show_progress: true,
        }
    }

    /// Documents assigned to worker `worker_idx` (0-based).
    ///
    /// The target is split evenly; the first `target % workers` workers take
    /// one extra document, so the shares sum to exactly `target_docs`.
    pub fn docs_for_worker(&self, worker_idx: usize) -> u64 {
        let workers = self.workers.max(1) as u64;
        let base = self.target_docs / workers;
        let extra = u64::from((worker_idx as u64) < self.target_docs % workers);
        base + extra
    }

    /// Batches the busiest worker sends.
    pub fn batches_per_worker(&self) -> u64 {
        self.docs_for_worker(0).div_ceil(self.batch_size.max(1) as u64)
    }
}

/// Totals once every worker has returned.
#[derive(Debug, Clone, Default)]
pub struct GenerationSummary {
    pub indexed: u64,
    pub failed_batches: u64,
    pub workers_stopped_early: usize,
    pub elapsed: Duration,
    /// `_count` after the final refresh, when it could be read
    pub index_count: Option<u64>,
    pub workers: Vec<WorkerReport>,
}

impl GenerationSummary {
    pub fn docs_per_sec(&self) -> f64 {
        rate_per_sec(self.indexed, self.elapsed.as_secs_f64())
    }
}

/// Run the connection test, the worker pool and the final refresh/count.
pub async fn run_generation(
    cluster: &ClusterConfig,
    generator: Arc<dyn LogGenerator>,
    plan: &GenerationPlan,
) -> Result<GenerationSummary> {
    let client_config = BulkClientConfig::from(cluster);

    if !plan.skip_connection_test {
        connection_test(&client_config, generator.as_ref()).await?;
    }

    let batches = plan.batches_per_worker();
    info!(
        "{}: {} docs, {} workers, {} batch size, {} batches per worker",
        generator.profile().log_type,
        format_number(plan.target_docs),
        plan.workers,
        format_number(plan.batch_size as u64),
        format_number(batches)
    );

    let progress = if plan.show_progress {
        let bar = ProgressBar::new(plan.target_docs);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {human_pos}/{human_len} ({per_sec})")
                .map_err(|e| Error::Configuration(format!("invalid progress template: {e}")))?
                .progress_chars("#>-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let start = Instant::now();
    let mut workers = JoinSet::new();
    for worker_id in 1..=plan.workers {
        let docs = plan.docs_for_worker(worker_id - 1);
        if docs == 0 {
            continue;
        }
        // One client per worker keeps connection pools private.
        let client = BulkClient::new(client_config.clone())?;
        let generator = Arc::clone(&generator);
        let progress = progress.clone();
        let settings = WorkerSettings {
            worker_id,
            index: plan.index.clone(),
            docs,
            batch_size: plan.batch_size,
            max_consecutive_failures: plan.max_consecutive_failures,
            batch_delay: plan.batch_delay,
            retry: plan.retry,
            progress_every: 10,
        };
        workers.spawn(async move {
            run_worker(client, generator, settings, move |n| progress.inc(n)).await
        });
    }

    let mut summary = GenerationSummary::default();
    while let Some(joined) = workers.join_next().await {
        let report = match joined {
            Ok(report) => report,
            Err(e) => {
                error!("Worker task failed: {}", e);
                continue;
            }
        };
        summary.indexed += report.indexed;
        summary.failed_batches += report.failed_batches;
        if report.stopped_early {
            summary.workers_stopped_early += 1;
        }
        let elapsed = start.elapsed().as_secs_f64();
        progress.println(format!(
            "Worker {} completed: {} docs, {} failures | Total: {} | Rate: {:.0} docs/sec",
            report.worker_id,
            format_number(report.indexed),
            report.failed_batches,
            format_number(summary.indexed),
            rate_per_sec(summary.indexed, elapsed)
        ));
        summary.workers.push(report);
    }
    progress.finish_and_clear();
    summary.elapsed = start.elapsed();

    info!(
        "Completed: {} docs in {:.1}s ({:.0} docs/sec), {} failed batches",
        format_number(summary.indexed),
        summary.elapsed.as_secs_f64(),
        summary.docs_per_sec(),
        summary.failed_batches
    );

    let client = BulkClient::new(client_config)?;
    if let Err(e) = client.refresh(&plan.index).await {
        warn!("Refresh failed: {}", e);
    }
    match client.count(&plan.index).await {
        Ok(count) => {
            info!("Index '{}' now holds {} documents", plan.index, format_number(count));
            summary.index_count = Some(count);
        }
        Err(e) => warn!("Could not read document count: {}", e),
    }

    Ok(summary)
}

async fn connection_test(config: &BulkClientConfig, generator: &dyn LogGenerator) -> Result<()> {
    info!("Testing connection...");
    let client = BulkClient::new(config.clone())?;
    let docs = generator.generate_batch(CONNECTION_TEST_DOCS);
    match client.bulk_index(CONNECTION_TEST_INDEX, &docs).await {
        Ok(resp) if !resp.errors => {
            info!("Connection test successful");
            Ok(())
        }
        Ok(resp) => Err(Error::Http(format!(
            "connection test rejected: {}",
            resp.first_error()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "bulk response reported errors".to_string())
        ))),
        Err(e) => Err(Error::Http(format!(
            "connection test failed, check credentials and endpoint: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::generator_for;
    use calcite_perf_common::LogType;

    #[test]
    fn test_worker_shares_sum_to_target() {
        let generator = generator_for(LogType::Cloudtrail).unwrap();
        let mut plan = GenerationPlan::for_profile(&generator.profile(), "logs", 100_000_000);
        // 8 workers, 12_500_000 docs each, 1500 per batch
        assert_eq!(plan.docs_for_worker(0), 12_500_000);
        assert_eq!(plan.batches_per_worker(), 8334);

        for target in [0u64, 1, 7, 10, 24_000, 100_003] {
            plan.target_docs = target;
            let total: u64 = (0..plan.workers).map(|w| plan.docs_for_worker(w)).sum();
            assert_eq!(total, target);
        }

        plan.target_docs = 10;
        assert_eq!(plan.docs_for_worker(0), 2);
        assert_eq!(plan.docs_for_worker(7), 1);
        assert_eq!(plan.batches_per_worker(), 1);
    }

    #[test]
    fn test_plan_inherits_profile() {
        let generator = generator_for(LogType::Vpc).unwrap();
        let plan = GenerationPlan::for_profile(&generator.profile(), "vpc_logs", 1000);
        assert_eq!(plan.batch_size, 2000);
        assert_eq!(plan.workers, 4);
        assert_eq!(plan.max_consecutive_failures, 10);
        assert_eq!(plan.retry.max_attempts, 3);
    }
}
