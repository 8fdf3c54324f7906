//! Schema-specific document generators.

mod cloudtrail;
mod nfw;
mod vpc;
mod waf;

use std::sync::Arc;
use std::time::Duration;

use calcite_perf_common::{EnvRequirements, Error, LogType, Result};
use chrono::Utc;
use serde_json::Value;

pub use cloudtrail::CloudTrailGenerator;
pub use nfw::NetworkFirewallGenerator;
pub use vpc::VpcFlowGenerator;
pub use waf::WafGenerator;

/// Default run shape for one generator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorProfile {
    pub log_type: LogType,
    pub batch_size: usize,
    pub workers: usize,
    /// A worker stops once its consecutive failed batches exceed this
    pub max_consecutive_failures: u32,
    /// Pause between batches inside one worker
    pub batch_delay: Duration,
    pub env: EnvRequirements,
}

/// Produces randomized documents matching one index schema.
pub trait LogGenerator: Send + Sync {
    fn profile(&self) -> GeneratorProfile;

    fn generate(&self) -> Value;

    fn generate_batch(&self, size: usize) -> Vec<Value> {
        (0..size).map(|_| self.generate()).collect()
    }
}

/// Build the generator for a log type, sampling its value pools.
pub fn generator_for(log_type: LogType) -> Result<Arc<dyn LogGenerator>> {
    match log_type {
        LogType::Vpc => Ok(Arc::new(VpcFlowGenerator::new())),
        LogType::Nfw => Ok(Arc::new(NetworkFirewallGenerator::new())),
        LogType::Cloudtrail => Ok(Arc::new(CloudTrailGenerator::new())),
        LogType::Waf => Ok(Arc::new(WafGenerator::new())),
        LogType::Big5 => Err(Error::InvalidInput(
            "big5 documents are loaded from a file with the `ingest` command".to_string(),
        )),
    }
}

/// ISO-8601 timestamp shared by every document of a run.
pub(crate) fn base_timestamp(with_zone: bool) -> String {
    let now = Utc::now();
    if with_zone {
        now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    } else {
        now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}
