use std::time::Duration;

use calcite_perf_common::{EnvRequirements, LogType};
use rand::Rng;
use serde_json::{json, Value};

use super::{base_timestamp, GeneratorProfile, LogGenerator};
use crate::pools::{self, pick};

const EVENT_SOURCES: [&str; 5] = [
    "s3.amazonaws.com",
    "dynamodb.amazonaws.com",
    "lambda.amazonaws.com",
    "ec2.amazonaws.com",
    "iam.amazonaws.com",
];
const S3_EVENTS: [&str; 5] = ["GetObject", "PutObject", "DeleteObject", "HeadObject", "CopyObject"];
const OTHER_EVENTS: [&str; 4] = ["RunInstances", "TerminateInstances", "CreateUser", "DeleteUser"];
const REGIONS: [&str; 5] = [
    "us-east-1",
    "us-west-2",
    "eu-west-1",
    "ap-northeast-1",
    "ap-southeast-1",
];
const USER_AGENTS: [&str; 4] = [
    "aws-cli/2.13.0",
    "aws-sdk-java/1.12.529",
    "Boto3/1.28.25",
    "S3Console/0.4",
];
const RESULTS: [&str; 2] = ["ACCEPT", "REJECT"];
const CATEGORIES: [&str; 2] = ["Data", "Management"];
const API_VERSIONS: [&str; 3] = ["2006-03-01", "2012-08-10", "2015-03-31"];
const IDENTITY_TYPES: [&str; 3] = ["IAMUser", "AssumedRole", "Root"];
const REQUEST_SUFFIXES: [&str; 3] = ["abcd", "efgh", "ijkl"];
const EVENT_SUFFIXES: [&str; 3] = ["wxyz", "mnop", "qrst"];

/// CloudTrail API call records with ECS-style `event` and `cloud` blocks.
pub struct CloudTrailGenerator {
    timestamp: String,
    account_ids: Vec<String>,
    user_names: Vec<String>,
    source_ips: Vec<String>,
}

impl CloudTrailGenerator {
    pub fn new() -> Self {
        Self {
            timestamp: base_timestamp(true),
            account_ids: pools::account_ids(1_000),
            user_names: pools::numbered_names("user", 5_000),
            source_ips: pools::ipv4_pool(50_000, 1..=255),
        }
    }
}

impl Default for CloudTrailGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogGenerator for CloudTrailGenerator {
    fn profile(&self) -> GeneratorProfile {
        GeneratorProfile {
            log_type: LogType::Cloudtrail,
            batch_size: 1500,
            workers: 8,
            max_consecutive_failures: 5,
            batch_delay: Duration::from_millis(20),
            env: EnvRequirements::OPTIONAL_AUTH_INGEST,
        }
    }

    fn generate(&self) -> Value {
        let mut rng = rand::thread_rng();
        let event_source = pick(&mut rng, &EVENT_SOURCES);
        let account_id = pick(&mut rng, &self.account_ids);
        let region = pick(&mut rng, &REGIONS);
        let event_name = if event_source == "s3.amazonaws.com" {
            pick(&mut rng, &S3_EVENTS)
        } else {
            pick(&mut rng, &OTHER_EVENTS)
        };
        let service = event_source.split('.').next().unwrap_or(event_source);

        json!({
            "@timestamp": self.timestamp,
            "event": {
                "result": pick(&mut rng, &RESULTS),
                "name": "cloud_trail",
                "domain": "cloudtrail"
            },
            "cloud": {
                "provider": "aws",
                "account": { "id": account_id },
                "region": region,
                "resource_id": format!("i-{:x}", rng.gen_range(100_000_000_000u64..=999_999_999_999)),
                "platform": "aws_ec2"
            },
            "aws": {
                "cloudtrail": {
                    "eventVersion": "1.08",
                    "eventName": event_name,
                    "eventSource": event_source,
                    "eventTime": self.timestamp,
                    "eventType": "AwsApiCall",
                    "eventCategory": pick(&mut rng, &CATEGORIES),
                    "sourceIPAddress": pick(&mut rng, &self.source_ips),
                    "userAgent": pick(&mut rng, &USER_AGENTS),
                    "requestID": format!(
                        "req-{}-{}",
                        rng.gen_range(100_000_000..=999_999_999u32),
                        pick(&mut rng, &REQUEST_SUFFIXES)
                    ),
                    "eventID": format!(
                        "evt-{}-{}",
                        rng.gen_range(100_000_000..=999_999_999u32),
                        pick(&mut rng, &EVENT_SUFFIXES)
                    ),
                    "awsRegion": region,
                    "recipientAccountId": account_id,
                    "apiVersion": pick(&mut rng, &API_VERSIONS),
                    "readOnly": rng.gen::<bool>(),
                    "userIdentity": {
                        "type": pick(&mut rng, &IDENTITY_TYPES),
                        "principalId": format!("AIDA{}", pools::random_account_id(&mut rng)),
                        "arn": format!(
                            "arn:aws:iam::{account_id}:user/{}",
                            pick(&mut rng, &self.user_names)
                        ),
                        "accountId": account_id,
                        "accessKeyId": format!("AKIA{}", pools::random_account_id(&mut rng))
                    },
                    "resources": [{
                        "accountId": account_id,
                        "type": format!("AWS::{}::Object", service.to_uppercase()),
                        "ARN": format!(
                            "arn:aws:{service}:{region}:{account_id}:resource/{}",
                            rng.gen_range(100_000..=999_999u32)
                        )
                    }]
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_name_follows_source() {
        let generator = CloudTrailGenerator::new();
        for _ in 0..100 {
            let doc = generator.generate();
            let trail = &doc["aws"]["cloudtrail"];
            let source = trail["eventSource"].as_str().unwrap();
            let name = trail["eventName"].as_str().unwrap();
            if source == "s3.amazonaws.com" {
                assert!(S3_EVENTS.contains(&name));
            } else {
                assert!(OTHER_EVENTS.contains(&name));
            }
        }
    }

    #[test]
    fn test_account_is_consistent_within_document() {
        let doc = CloudTrailGenerator::new().generate();
        let account = doc["cloud"]["account"]["id"].as_str().unwrap();
        let trail = &doc["aws"]["cloudtrail"];

        assert_eq!(trail["recipientAccountId"], account);
        assert_eq!(trail["userIdentity"]["accountId"], account);
        assert!(trail["userIdentity"]["arn"]
            .as_str()
            .unwrap()
            .starts_with(&format!("arn:aws:iam::{account}:user/user-")));
        assert_eq!(trail["awsRegion"], doc["cloud"]["region"]);

        let resource_type = trail["resources"][0]["type"].as_str().unwrap();
        assert!(resource_type.starts_with("AWS::") && resource_type.ends_with("::Object"));
    }
}
