use std::time::Duration;

use calcite_perf_common::{EnvRequirements, LogType};
use rand::Rng;
use serde_json::{json, Map, Value};

use super::{base_timestamp, GeneratorProfile, LogGenerator};
use crate::pools::{self, pick};

const FIELD_PREFIX: &str = "aws.networkfirewall.";

const PROTOCOLS: [&str; 3] = ["TCP", "UDP", "ICMP"];
const APP_PROTOCOLS: [&str; 7] = ["http", "https", "ssh", "ftp", "dns", "smtp", "unknown"];
const DEST_PORTS: [u16; 10] = [80, 443, 22, 21, 53, 25, 3389, 8080, 8443, 9200];
const ACTIONS: [&str; 4] = ["ALLOW", "DROP", "REJECT", "ALERT"];
const CATEGORIES: [&str; 4] = ["Malware", "Trojan", "Policy Violation", "Suspicious Activity"];
const AVAILABILITY_ZONES: [&str; 4] = ["us-east-1a", "us-east-1b", "us-west-2a", "us-west-2b"];
const REGIONS: [&str; 4] = ["us-east-1", "us-west-2", "eu-west-1", "ap-northeast-1"];
const CLASSIFICATIONS: [&str; 3] = [
    "Attempted Information Leak",
    "Web Application Attack",
    "Trojan Activity",
];
const SRC_COUNTRIES: [&str; 7] = ["US", "CN", "RU", "DE", "GB", "FR", "JP"];
const DEST_COUNTRIES: [&str; 5] = ["US", "CA", "GB", "DE", "FR"];
const URL_RESOURCES: [&str; 3] = ["users", "data", "files"];
const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
    "curl/7.68.0",
    "Python-urllib/3.9",
    "Go-http-client/1.1",
];
const HTTP_METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];
const HTTP_STATUSES: [u16; 5] = [200, 404, 403, 500, 502];
const DNS_HOSTS: [&str; 4] = ["api", "www", "mail", "ftp"];
const DNS_DOMAINS: [&str; 3] = ["example", "test", "demo"];
const DNS_TLDS: [&str; 3] = ["com", "org", "net"];
const DNS_TYPES: [&str; 5] = ["A", "AAAA", "CNAME", "MX", "TXT"];
const TLS_VERSIONS: [&str; 2] = ["TLSv1.2", "TLSv1.3"];
const TLS_CIPHERS: [&str; 3] = [
    "TLS_AES_256_GCM_SHA384",
    "TLS_CHACHA20_POLY1305_SHA256",
    "ECDHE-RSA-AES256-GCM-SHA384",
];

/// AWS Network Firewall events, indexed with flat dotted field names.
pub struct NetworkFirewallGenerator {
    timestamp: String,
    firewall_names: Vec<String>,
    src_ips: Vec<String>,
    dest_ips: Vec<String>,
    interface_ids: Vec<String>,
    vpc_ids: Vec<String>,
    subnet_ids: Vec<String>,
}

impl NetworkFirewallGenerator {
    pub fn new() -> Self {
        Self {
            timestamp: base_timestamp(false),
            firewall_names: pools::numbered_names("fw", 5_000),
            src_ips: pools::ipv4_pool(50_000, 10..=192),
            dest_ips: pools::ipv4_pool(50_000, 1..=255),
            interface_ids: pools::prefixed_ids("eni", 10_000, 16),
            vpc_ids: pools::prefixed_ids("vpc", 2_000, 16),
            subnet_ids: pools::prefixed_ids("subnet", 5_000, 16),
        }
    }
}

impl Default for NetworkFirewallGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogGenerator for NetworkFirewallGenerator {
    fn profile(&self) -> GeneratorProfile {
        GeneratorProfile {
            log_type: LogType::Nfw,
            batch_size: 1500,
            workers: 8,
            max_consecutive_failures: 10,
            batch_delay: Duration::ZERO,
            env: EnvRequirements::AUTHENTICATED_INGEST,
        }
    }

    fn generate(&self) -> Value {
        let mut rng = rand::thread_rng();
        let ts = &self.timestamp;
        let mut doc = Map::with_capacity(48);
        let mut put = |field: &str, value: Value| {
            doc.insert(format!("{FIELD_PREFIX}{field}"), value);
        };

        put("firewall_name", json!(pick(&mut rng, &self.firewall_names)));
        put("event.timestamp", json!(ts));
        put("event.src_ip", json!(pick(&mut rng, &self.src_ips)));
        put("event.dest_ip", json!(pick(&mut rng, &self.dest_ips)));
        put("event.src_port", json!(rng.gen_range(1024..=65_535u32)));
        put("event.dest_port", json!(pick(&mut rng, &DEST_PORTS)));
        put("event.proto", json!(pick(&mut rng, &PROTOCOLS)));
        put("event.app_proto", json!(pick(&mut rng, &APP_PROTOCOLS)));
        put("event.tcp.tcp_flags", json!(rng.gen_range(0..=255u8).to_string()));
        put("event.tcp.syn", json!(rng.gen::<bool>()));
        put("event.tcp.ack", json!(rng.gen::<bool>()));
        put("event.tcp.fin", json!(rng.gen::<bool>()));
        put("event.tcp.rst", json!(rng.gen::<bool>()));
        put("event.netflow.pkts", json!(rng.gen_range(1..=10_000u32)));
        put("event.netflow.bytes", json!(rng.gen_range(64..=1_048_576u32)));
        put("event.netflow.age", json!(rng.gen_range(1..=3_600u32)));
        put("event.netflow.start", json!(ts));
        put("event.netflow.end", json!(ts));
        put("event.action", json!(pick(&mut rng, &ACTIONS)));
        put("event.rule_group_name", json!(format!("rulegroup-{}", rng.gen_range(1000..=9999))));
        put("event.rule_name", json!(format!("rule-{}", rng.gen_range(10_000..=99_999))));
        put("event.rule_priority", json!(rng.gen_range(1..=65_535u32)));
        put("event.signature_id", json!(rng.gen_range(1_000_000..=9_999_999u32)));
        put("event.signature_rev", json!(rng.gen_range(1..=100u32)));
        put("event.category", json!(pick(&mut rng, &CATEGORIES)));
        put("event.severity", json!(rng.gen_range(1..=4u8)));
        put("interface_id", json!(pick(&mut rng, &self.interface_ids)));
        put("vpc_id", json!(pick(&mut rng, &self.vpc_ids)));
        put("subnet_id", json!(pick(&mut rng, &self.subnet_ids)));
        put("availability_zone", json!(pick(&mut rng, &AVAILABILITY_ZONES)));
        put("account_id", json!(pools::random_account_id(&mut rng)));
        put("region", json!(pick(&mut rng, &REGIONS)));
        put("event.flow_id", json!(format!("flow-{}", rng.gen_range(100_000_000..=999_999_999u32))));
        put("event.event_id", json!(format!("event-{}", rng.gen_range(100_000_000..=999_999_999u32))));
        put("event.classification", json!(pick(&mut rng, &CLASSIFICATIONS)));
        let sid = rng.gen_range(2_000_000..=2_999_999u32);
        put("event.reference", json!(format!("http://www.emergingthreats.net/sid/{sid}")));
        put("event.geoip.src_country", json!(pick(&mut rng, &SRC_COUNTRIES)));
        put("event.geoip.dest_country", json!(pick(&mut rng, &DEST_COUNTRIES)));
        put("event.http.hostname", json!(format!("host-{}.example.com", rng.gen_range(1000..=9999))));
        let url = format!(
            "/api/v{}/{}/{}",
            rng.gen_range(1..=3),
            pick(&mut rng, &URL_RESOURCES),
            pools::hex_suffix(16)
        );
        put("event.http.url", json!(url));
        put("event.http.user_agent", json!(pick(&mut rng, &USER_AGENTS)));
        put("event.http.method", json!(pick(&mut rng, &HTTP_METHODS)));
        put("event.http.status", json!(pick(&mut rng, &HTTP_STATUSES)));
        let dns_query = format!(
            "{}.{}.{}",
            pick(&mut rng, &DNS_HOSTS),
            pick(&mut rng, &DNS_DOMAINS),
            pick(&mut rng, &DNS_TLDS)
        );
        put("event.dns.query", json!(dns_query));
        put("event.dns.type", json!(pick(&mut rng, &DNS_TYPES)));
        put("event.tls.sni", json!(format!("secure-{}.example.com", rng.gen_range(1000..=9999))));
        put("event.tls.version", json!(pick(&mut rng, &TLS_VERSIONS)));
        put("event.tls.cipher", json!(pick(&mut rng, &TLS_CIPHERS)));

        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_dotted_fields() {
        let generator = NetworkFirewallGenerator::new();
        let doc = generator.generate();
        let obj = doc.as_object().unwrap();

        assert_eq!(obj.len(), 48);
        assert!(obj.keys().all(|k| k.starts_with("aws.networkfirewall.")));
        assert!(obj["aws.networkfirewall.vpc_id"]
            .as_str()
            .unwrap()
            .starts_with("vpc-"));
        assert!(obj["aws.networkfirewall.event.tcp.syn"].is_boolean());
        assert!(obj["aws.networkfirewall.event.tcp.tcp_flags"].is_string());

        let severity = obj["aws.networkfirewall.event.severity"].as_u64().unwrap();
        assert!((1..=4).contains(&severity));
    }
}
