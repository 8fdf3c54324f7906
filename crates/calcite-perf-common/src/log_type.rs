//! Catalogue of the log families used by the generators and query sets.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A family of log documents, which doubles as the query directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    /// VPC flow logs
    Vpc,
    /// AWS Network Firewall logs
    Nfw,
    /// CloudTrail logs
    Cloudtrail,
    /// WAF logs
    Waf,
    /// Big5 benchmark corpus
    Big5,
}

impl LogType {
    /// Log types that have synthetic generators and are loaded by `all`.
    pub const GENERATED: [LogType; 4] = [
        LogType::Vpc,
        LogType::Nfw,
        LogType::Cloudtrail,
        LogType::Waf,
    ];

    pub const ALL: [LogType; 5] = [
        LogType::Vpc,
        LogType::Nfw,
        LogType::Cloudtrail,
        LogType::Waf,
        LogType::Big5,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Vpc => "vpc",
            LogType::Nfw => "nfw",
            LogType::Cloudtrail => "cloudtrail",
            LogType::Waf => "waf",
            LogType::Big5 => "big5",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LogType::Vpc => "VPC Flow Logs",
            LogType::Nfw => "Network Firewall Logs",
            LogType::Cloudtrail => "CloudTrail Logs",
            LogType::Waf => "WAF Logs",
            LogType::Big5 => "Big5 Logs",
        }
    }

    /// Guess the log type from a result file name, falling back to the name
    /// of its parent directory.
    pub fn detect(path: &Path) -> Option<LogType> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if file_name.contains("vpc") {
            return Some(LogType::Vpc);
        }
        if file_name.contains("nfw") || file_name.contains("networkfirewall") {
            return Some(LogType::Nfw);
        }
        if file_name.contains("cloudtrail") {
            return Some(LogType::Cloudtrail);
        }
        if file_name.contains("waf") {
            return Some(LogType::Waf);
        }
        if file_name.contains("big5") {
            return Some(LogType::Big5);
        }

        path.parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_string_lossy().to_lowercase().parse().ok())
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vpc" => Ok(LogType::Vpc),
            "nfw" => Ok(LogType::Nfw),
            "cloudtrail" => Ok(LogType::Cloudtrail),
            "waf" => Ok(LogType::Waf),
            "big5" => Ok(LogType::Big5),
            other => Err(Error::InvalidInput(format!("unknown log type '{other}'"))),
        }
    }
}
