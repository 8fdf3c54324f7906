//! Shared building blocks for the Calcite vs Non-Calcite performance tooling.
//!
//! Every binary in the workspace talks to the same search cluster and reads
//! the same environment, so the error type, cluster configuration and the
//! log-type catalogue live here.

pub mod config;
pub mod duration;
pub mod error;
pub mod format;
pub mod log_type;
pub mod output;

pub use config::{ClusterConfig, Credentials, EnvRequirements};
pub use duration::parse_duration;
pub use error::{Error, Result};
pub use log_type::LogType;
