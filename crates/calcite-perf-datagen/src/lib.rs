//! Synthetic log generation and bulk ingestion.
//!
//! Generators pre-sample pools of high-cardinality values once, then build
//! documents by drawing from those pools. A fixed number of workers, each
//! owning its own HTTP client, push batches to the `_bulk` endpoint with
//! retry and backoff.

pub mod bulk;
pub mod generators;
pub mod ingest;
pub mod pools;
pub mod runner;
pub mod worker;

pub use bulk::{BulkClient, BulkClientConfig, BulkResponse, RetryPolicy};
pub use generators::{generator_for, GeneratorProfile, LogGenerator};
pub use ingest::{ingest_file, IngestOptions, IngestSummary};
pub use runner::{run_generation, GenerationPlan, GenerationSummary};
pub use worker::{run_worker, WorkerReport, WorkerSettings};
