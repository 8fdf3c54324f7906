//! Simulated-user swarm.

use std::sync::Arc;
use std::time::Duration;

use calcite_perf_common::{ClusterConfig, Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinSet;
use tokio::time::{interval, sleep};
use tracing::{info, warn};

use crate::client::QueryClient;
use crate::queries::QuerySet;
use crate::stats::StatsCollector;

/// Shortest gap between two user starts.
const MIN_SPAWN_INTERVAL: Duration = Duration::from_millis(1);

/// Shape of a load test run.
#[derive(Debug, Clone)]
pub struct LoadTestConfig {
    /// Concurrent simulated users
    pub users: usize,
    /// Users started per second
    pub spawn_rate: f64,
    /// `None` runs until Ctrl+C
    pub run_time: Option<Duration>,
    /// Think time between requests is uniform in `[wait_min, wait_max]`
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub request_timeout: Duration,
    /// Zero disables the periodic console line
    pub report_interval: Duration,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            users: 10,
            spawn_rate: 1.0,
            run_time: Some(Duration::from_secs(60)),
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(3),
            request_timeout: Duration::from_secs(60),
            report_interval: Duration::from_secs(10),
        }
    }
}

impl LoadTestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.users == 0 {
            return Err(Error::InvalidInput("users must be > 0".to_string()));
        }
        self.spawn_interval()?;
        if self.wait_min > self.wait_max {
            return Err(Error::InvalidInput(format!(
                "wait-min ({:?}) is greater than wait-max ({:?})",
                self.wait_min, self.wait_max
            )));
        }
        Ok(())
    }

    /// Delay between two user starts, at least [`MIN_SPAWN_INTERVAL`].
    ///
    /// Fails for a non-positive rate or one so small the delay overflows.
    pub fn spawn_interval(&self) -> Result<Duration> {
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0) {
            return Err(Error::InvalidInput("spawn rate must be > 0".to_string()));
        }
        Duration::try_from_secs_f64(1.0 / self.spawn_rate)
            .map(|interval| interval.max(MIN_SPAWN_INTERVAL))
            .map_err(|e| {
                Error::InvalidInput(format!("spawn rate {} is out of range: {e}", self.spawn_rate))
            })
    }

    fn think_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.wait_max <= self.wait_min {
            self.wait_min
        } else {
            rng.gen_range(self.wait_min..=self.wait_max)
        }
    }
}

/// Run users until the run time elapses or Ctrl+C.
///
/// Every request is recorded into `stats`; failures never stop the run.
pub async fn run_load_test(
    cluster: &ClusterConfig,
    queries: Arc<QuerySet>,
    config: &LoadTestConfig,
    stats: Arc<StatsCollector>,
) -> Result<()> {
    config.validate()?;
    if queries.is_empty() {
        return Err(Error::InvalidInput("query set is empty".to_string()));
    }

    // All clients exist before the first request is sent.
    let mut clients = Vec::with_capacity(config.users);
    for _ in 0..config.users {
        clients.push(QueryClient::new(cluster, config.request_timeout)?);
    }

    info!(
        "Starting {} users at {} users/s against {}",
        config.users, config.spawn_rate, cluster.endpoint
    );

    let spawn_interval = config.spawn_interval()?;
    let mut swarm = tokio::spawn(swarm(
        clients,
        queries,
        config.clone(),
        spawn_interval,
        Arc::clone(&stats),
    ));
    let reporter = (!config.report_interval.is_zero())
        .then(|| tokio::spawn(report_periodically(Arc::clone(&stats), config.report_interval)));

    let finished_early = tokio::select! {
        _ = wait_for_stop(config.run_time) => None,
        joined = &mut swarm => Some(joined),
    };
    let joined = match finished_early {
        Some(joined) => joined,
        None => {
            // Dropping the swarm's JoinSet aborts every user.
            swarm.abort();
            swarm.await
        }
    };
    if let Some(reporter) = reporter {
        reporter.abort();
        let _ = reporter.await;
    }

    match joined {
        Err(e) if e.is_panic() => {
            Err(Error::Other(anyhow::anyhow!("user swarm panicked: {e}")))
        }
        _ => Ok(()),
    }
}

async fn wait_for_stop(run_time: Option<Duration>) {
    match run_time {
        Some(run_time) => {
            tokio::select! {
                _ = sleep(run_time) => info!("Run time of {:?} reached, stopping", run_time),
                _ = tokio::signal::ctrl_c() => warn!("Interrupted, stopping"),
            }
        }
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Could not listen for Ctrl+C: {}", e);
            }
            info!("Stopping");
        }
    }
}

async fn swarm(
    clients: Vec<QueryClient>,
    queries: Arc<QuerySet>,
    config: LoadTestConfig,
    spawn_interval: Duration,
    stats: Arc<StatsCollector>,
) {
    let config = Arc::new(config);
    let mut users = JoinSet::new();
    let mut spawn_tick = interval(spawn_interval);

    for (user_id, client) in clients.into_iter().enumerate() {
        spawn_tick.tick().await;
        users.spawn(user_loop(
            user_id + 1,
            client,
            Arc::clone(&queries),
            Arc::clone(&config),
            Arc::clone(&stats),
        ));
    }
    info!("All {} users spawned", config.users);

    while let Some(joined) = users.join_next().await {
        if let Err(e) = joined {
            warn!("User task ended unexpectedly: {}", e);
        }
    }
}

async fn user_loop(
    user_id: usize,
    client: QueryClient,
    queries: Arc<QuerySet>,
    config: Arc<LoadTestConfig>,
    stats: Arc<StatsCollector>,
) {
    let mut rng = StdRng::from_entropy();
    tracing::debug!("User {} started", user_id);

    loop {
        let Some(query) = queries.pick(&mut rng) else {
            return;
        };
        let outcome = client.execute(query).await;
        if let Some(error) = &outcome.error {
            tracing::debug!("User {}: {} failed: {}", user_id, outcome.name, error);
        }
        stats.record(&outcome);

        sleep(config.think_time(&mut rng)).await;
    }
}

async fn report_periodically(stats: Arc<StatsCollector>, every: Duration) {
    let mut ticker = interval(every);
    ticker.tick().await;
    let mut last_requests = 0u64;

    loop {
        ticker.tick().await;
        let (requests, failures) = stats.totals();
        let rate = (requests - last_requests) as f64 / every.as_secs_f64();
        let p95 = stats.snapshot().aggregated.p95;
        info!(
            "Requests: {:>8} | Failures: {:>6} | Rate: {:>7.1} req/s | p95: {:>6} ms",
            requests, failures, rate, p95
        );
        last_requests = requests;
    }
}
