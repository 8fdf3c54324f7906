use std::time::Duration;

use calcite_perf_common::{EnvRequirements, LogType};
use rand::Rng;
use serde_json::{json, Value};

use super::{base_timestamp, GeneratorProfile, LogGenerator};
use crate::pools::{self, pick};

const REGIONS: [&str; 2] = ["us-east-1", "us-west-2"];
const ACTIONS: [&str; 2] = ["ACCEPT", "REJECT"];
const STATUSES: [&str; 2] = ["OK", "NODATA"];
const DIRECTIONS: [&str; 2] = ["ingress", "egress"];
const SERVICES: [&str; 2] = ["S3", "EC2"];
const PORTS: [u16; 3] = [22, 80, 443];
const IP_BASES: [&str; 2] = ["172.31", "10.0"];

/// VPC flow log records under `aws.vpc`.
pub struct VpcFlowGenerator {
    timestamp: String,
    account_ids: Vec<String>,
}

impl VpcFlowGenerator {
    pub fn new() -> Self {
        Self {
            timestamp: base_timestamp(true),
            account_ids: pools::account_ids(50),
        }
    }

    fn address<R: Rng + ?Sized>(rng: &mut R) -> String {
        format!(
            "{}.{}.{}",
            pick(rng, &IP_BASES),
            rng.gen_range(1..=255u8),
            rng.gen_range(1..=255u8)
        )
    }
}

impl Default for VpcFlowGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogGenerator for VpcFlowGenerator {
    fn profile(&self) -> GeneratorProfile {
        GeneratorProfile {
            log_type: LogType::Vpc,
            batch_size: 2000,
            workers: 4,
            max_consecutive_failures: 10,
            batch_delay: Duration::ZERO,
            env: EnvRequirements::AUTHENTICATED_INGEST,
        }
    }

    fn generate(&self) -> Value {
        let mut rng = rand::thread_rng();
        json!({
            "@timestamp": self.timestamp,
            "start_time": self.timestamp,
            "end_time": self.timestamp,
            "interval_start_time": self.timestamp,
            "aws": {
                "vpc": {
                    "account-id": pick(&mut rng, &self.account_ids),
                    "action": pick(&mut rng, &ACTIONS),
                    "bytes": rng.gen_range(64..=10_000u32),
                    "dstaddr": Self::address(&mut rng),
                    "srcaddr": Self::address(&mut rng),
                    "dstport": pick(&mut rng, &PORTS),
                    "srcport": rng.gen_range(1024..=65_535u32),
                    "packets": rng.gen_range(1..=100u32),
                    "region": pick(&mut rng, &REGIONS),
                    "status_code": pick(&mut rng, &STATUSES),
                    "flow-direction": pick(&mut rng, &DIRECTIONS),
                    "pkt-dst-aws-service": pick(&mut rng, &SERVICES),
                    "version": 2
                }
            }
        })
    }
}
