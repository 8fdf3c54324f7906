//! Query load generation against PPL and DSL endpoints.
//!
//! A fixed pool of simulated users repeatedly picks a named query at random
//! from a query set loaded once at startup, sends it, records the latency
//! under the query's name and waits a random think time. Results are written
//! in the same CSV layout Locust produces so the comparison tooling can read
//! either.

pub mod client;
pub mod queries;
pub mod reporter;
pub mod runner;
pub mod stats;

pub use client::{QueryClient, RequestOutcome};
pub use queries::{LogSelection, Query, QueryBody, QueryKind, QuerySet, QueryType};
pub use runner::{run_load_test, LoadTestConfig};
pub use stats::{FailureRow, StatsCollector, StatsRow, StatsSnapshot};
