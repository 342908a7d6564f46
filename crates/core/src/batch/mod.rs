//! Batch orchestrator for submission and polling.
//!
//! Drives every target sequence through its lifecycle:
//! - **Submission**: fixed worker pool draining a shared queue - bounded
//!   pressure on the service
//! - **Polling**: one timer-driven task sweeping all outstanding jobs
//! - **Materialization**: completed jobs are filed as soon as their
//!   artifacts are retrievable, while other submissions are still running

mod config;
mod runner;
mod types;

pub use config::{BatchConfig, RetryConfig};
pub use runner::BatchOrchestrator;
pub use types::{BatchError, BatchReport, FailureKind, Job, SequenceOutcome, SlotState};
