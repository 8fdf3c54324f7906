use std::time::Duration;

use calcite_perf_common::{EnvRequirements, LogType};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};

use super::{base_timestamp, GeneratorProfile, LogGenerator};
use crate::pools::{self, pick};

const ACTIONS: [&str; 5] = ["ALLOW", "BLOCK", "COUNT", "CAPTCHA", "CHALLENGE"];
const METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"];
const URIS: [&str; 7] = [
    "/api/v1/users",
    "/api/v1/orders",
    "/api/v1/products",
    "/health",
    "/admin",
    "/login",
    "/search",
];
const COUNTRIES: [&str; 9] = ["US", "GB", "DE", "FR", "JP", "CA", "AU", "BR", "IN"];
const RULE_TYPES: [&str; 3] = ["REGULAR", "RATE_BASED", "GROUP"];
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "curl/7.68.0",
    "Python-urllib/3.9",
];
const RESPONSE_CODES: [u16; 5] = [200, 201, 204, 403, 503];
const TERMINATING_ACTIONS: [&str; 3] = ["BLOCK", "ALLOW", "COUNT"];
const CONDITION_TYPES: [&str; 3] = ["SQL_INJECTION", "XSS", "SIZE_CONSTRAINT"];
const MATCH_LOCATIONS: [&str; 3] = ["HEADER", "QUERY_STRING", "URI"];
const MATCHED_DATA: [&str; 4] = ["select", "script", "union", "drop"];
const LABEL_NAMES: [&str; 2] = [
    "awswaf:managed:aws:core-rule-set",
    "awswaf:managed:aws:known-bad-inputs",
];
const LIMIT_KEYS: [&str; 2] = ["IP", "FORWARDED_IP"];
const MAX_RATES: [u32; 4] = [100, 500, 1000, 2000];
const EVALUATION_WINDOWS: [u32; 3] = [60, 120, 300];
const PAGE_LIMITS: [u32; 4] = [10, 20, 50, 100];
const REQUEST_SUFFIXES: [&str; 3] = ["abcd", "efgh", "ijkl"];
const JA3_LETTERS: [&str; 5] = ["a", "b", "c", "d", "e"];
const JA4_LETTERS: [&str; 3] = ["x", "y", "z"];
const CHALLENGE_CODES: [u16; 2] = [200, 405];

/// AWS WAF web ACL logs with nested rule-group detail.
pub struct WafGenerator {
    timestamp: String,
    account_ids: Vec<String>,
}

impl WafGenerator {
    pub fn new() -> Self {
        Self {
            timestamp: base_timestamp(true),
            account_ids: pools::account_ids(100),
        }
    }

    fn rule_group<R: Rng + ?Sized>(rng: &mut R) -> Value {
        let terminating_rule = if rng.gen::<f64>() > 0.7 {
            json!({
                "ruleId": format!("rule-{}", rng.gen_range(10_000..=99_999)),
                "action": pick(rng, &TERMINATING_ACTIONS),
                "ruleMatchDetails": [{
                    "conditionType": pick(rng, &CONDITION_TYPES),
                    "location": pick(rng, &MATCH_LOCATIONS),
                    "matchedData": [pick(rng, &MATCHED_DATA)]
                }]
            })
        } else {
            Value::Null
        };

        let non_terminating: Vec<Value> = if rng.gen::<f64>() > 0.5 {
            (0..rng.gen_range(1..=2))
                .map(|_| {
                    json!({
                        "ruleId": format!("rule-{}", rng.gen_range(10_000..=99_999)),
                        "action": "COUNT",
                        "ruleMatchDetails": []
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        json!({
            "ruleGroupId": format!("rulegroup-{}", rng.gen_range(100_000..=999_999)),
            "terminatingRule": terminating_rule,
            "nonTerminatingMatchingRules": non_terminating,
            "excludedRules": []
        })
    }

    fn labels<R: Rng + ?Sized>(rng: &mut R) -> Vec<Value> {
        if rng.gen::<f64>() > 0.6 {
            (0..rng.gen_range(1..=2))
                .map(|_| json!({ "name": pick(rng, &LABEL_NAMES) }))
                .collect()
        } else {
            Vec::new()
        }
    }

    fn rate_based_rules<R: Rng + ?Sized>(rng: &mut R) -> Vec<Value> {
        if rng.gen::<f64>() > 0.8 {
            vec![json!({
                "rateBasedRuleId": format!("rate-rule-{}", rng.gen_range(10_000..=99_999)),
                "rateBasedRuleName": format!("RateLimitRule{}", rng.gen_range(1..=5)),
                "limitKey": pick(rng, &LIMIT_KEYS),
                "maxRateAllowed": pick(rng, &MAX_RATES),
                "evaluationWindowSec": pick(rng, &EVALUATION_WINDOWS),
                "limitValue": pools::random_ipv4(rng, 1..=255)
            })]
        } else {
            Vec::new()
        }
    }

    /// CAPTCHA and challenge outcomes share one shape.
    fn solve_response<R: Rng + ?Sized>(rng: &mut R, failure_reason: &str) -> Value {
        let solved_at = Utc::now().timestamp_millis() - rng.gen_range(1_000..=60_000i64);
        let failure = if rng.gen::<f64>() > 0.3 {
            Value::Null
        } else {
            json!(failure_reason)
        };
        json!({
            "responseCode": pick(rng, &CHALLENGE_CODES),
            "solveTimestamp": solved_at,
            "failureReason": failure
        })
    }
}

impl Default for WafGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogGenerator for WafGenerator {
    fn profile(&self) -> GeneratorProfile {
        GeneratorProfile {
            log_type: LogType::Waf,
            batch_size: 1500,
            workers: 4,
            max_consecutive_failures: 10,
            batch_delay: Duration::ZERO,
            env: EnvRequirements::AUTHENTICATED_INGEST,
        }
    }

    fn generate(&self) -> Value {
        let mut rng = rand::thread_rng();
        let action = pick(&mut rng, &ACTIONS);
        let method = pick(&mut rng, &METHODS);

        let rule_groups: Vec<Value> = (0..rng.gen_range(1..=3))
            .map(|_| Self::rule_group(&mut rng))
            .collect();

        let (terminating_rule_id, terminating_rule_type) = if action == "ALLOW" {
            ("Default_Action".to_string(), "REGULAR")
        } else {
            (
                format!("rule-{}", rng.gen_range(10_000..=99_999)),
                pick(&mut rng, &RULE_TYPES),
            )
        };

        let webacl_id = format!(
            "arn:aws:wafv2:us-east-1:{}:regional/webacl/waf-{}/{}",
            pick(&mut rng, &self.account_ids),
            rng.gen_range(100_000..=999_999),
            rng.gen_range(10_000_000..=99_999_999)
        );
        let host = format!("api{}.example.com", rng.gen_range(1..=5));
        let forwarded_asn = if rng.gen::<f64>() > 0.5 {
            json!(rng.gen_range(1000..=65_535u32))
        } else {
            Value::Null
        };

        let mut doc = json!({
            "@timestamp": self.timestamp,
            "aws": {
                "waf": {
                    "formatVersion": 1,
                    "webaclId": webacl_id,
                    "terminatingRuleId": terminating_rule_id,
                    "terminatingRuleType": terminating_rule_type,
                    "action": action,
                    "httpSourceName": format!("CF-{}", rng.gen_range(1000..=9999)),
                    "httpSourceId": format!("source-{}", rng.gen_range(100_000..=999_999)),
                    "ruleGroupList": rule_groups,
                    "rateBasedRuleList": Self::rate_based_rules(&mut rng),
                    "responseCodeSent": pick(&mut rng, &RESPONSE_CODES),
                    "httpRequest": {
                        "clientIp": pools::random_ipv4(&mut rng, 1..=255),
                        "country": pick(&mut rng, &COUNTRIES),
                        "headers": [
                            { "name": "Host", "value": host },
                            { "name": "User-Agent", "value": pick(&mut rng, &USER_AGENTS) },
                            { "name": "Accept", "value": "application/json" }
                        ],
                        "uri": pick(&mut rng, &URIS),
                        "args": format!(
                            "page={}&limit={}",
                            rng.gen_range(1..=10),
                            pick(&mut rng, &PAGE_LIMITS)
                        ),
                        "httpVersion": "HTTP/1.1",
                        "httpMethod": method,
                        "requestId": format!(
                            "req-{}-{}",
                            rng.gen_range(100_000_000..=999_999_999u32),
                            pick(&mut rng, &REQUEST_SUFFIXES)
                        ),
                        "scheme": "https",
                        "host": format!("api{}.example.com", rng.gen_range(1..=5))
                    },
                    "labels": Self::labels(&mut rng),
                    "requestBodySize": rng.gen_range(0..=8192u32),
                    "requestBodySizeInspectedByWAF": rng.gen_range(0..=8192u32),
                    "ja3Fingerprint": format!(
                        "{}{}{}",
                        rng.gen_range(10_000..=99_999),
                        pick(&mut rng, &JA3_LETTERS),
                        rng.gen_range(10_000..=99_999)
                    ),
                    "ja4Fingerprint": format!(
                        "ja4_{}{}",
                        rng.gen_range(10_000..=99_999),
                        pick(&mut rng, &JA4_LETTERS)
                    ),
                    "clientAsn": rng.gen_range(1000..=65_535u32),
                    "forwardedAsn": forwarded_asn
                }
            }
        });

        let extra = match action {
            "CAPTCHA" => Some(("captchaResponse", Self::solve_response(&mut rng, "TOKEN_EXPIRED"))),
            "CHALLENGE" => Some((
                "challengeResponse",
                Self::solve_response(&mut rng, "TOKEN_INVALID"),
            )),
            _ => None,
        };
        if let (Some((key, value)), Some(waf)) = (extra, doc["aws"]["waf"].as_object_mut()) {
            waf.insert(key.to_string(), value);
        }

        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_uses_default_action() {
        let generator = WafGenerator::new();
        for _ in 0..200 {
            let doc = generator.generate();
            let waf = &doc["aws"]["waf"];
            if waf["action"] == "ALLOW" {
                assert_eq!(waf["terminatingRuleId"], "Default_Action");
                assert_eq!(waf["terminatingRuleType"], "REGULAR");
            } else {
                assert!(waf["terminatingRuleId"].as_str().unwrap().starts_with("rule-"));
            }
        }
    }

    #[test]
    fn test_solve_responses_follow_action() {
        let generator = WafGenerator::new();
        for _ in 0..200 {
            let doc = generator.generate();
            let waf = doc["aws"]["waf"].as_object().unwrap();
            let action = waf["action"].as_str().unwrap();
            assert_eq!(waf.contains_key("captchaResponse"), action == "CAPTCHA");
            assert_eq!(waf.contains_key("challengeResponse"), action == "CHALLENGE");
        }
    }

    #[test]
    fn test_rule_group_list_bounds() {
        let generator = WafGenerator::new();
        for _ in 0..100 {
            let doc = generator.generate();
            let groups = doc["aws"]["waf"]["ruleGroupList"].as_array().unwrap();
            assert!((1..=3).contains(&groups.len()));
            for group in groups {
                assert!(group["excludedRules"].as_array().unwrap().is_empty());
                let rules = group["nonTerminatingMatchingRules"].as_array().unwrap();
                assert!(rules.len() <= 2);
            }
        }
    }
}
