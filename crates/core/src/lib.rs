//! Batch homology-modeling submission core.
//!
//! Submits many protein sequences against one shared structural template
//! to a remote modeling service, polls the resulting jobs to completion
//! under the service's dual request-rate ceilings, and files returned
//! model structures into a per-cluster directory layout.

pub mod batch;
pub mod config;
pub mod materializer;
pub mod modeling;
pub mod quota;
pub mod sequence;
pub mod testing;

pub use batch::{
    BatchConfig, BatchError, BatchOrchestrator, BatchReport, FailureKind, RetryConfig,
    SequenceOutcome,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, OutputConfig,
    ServiceConfig,
};
pub use materializer::{FsMaterializer, MaterializeError, Materializer};
pub use modeling::{JobState, ModelingError, ModelingService, SwissModelClient};
pub use quota::{QuotaConfig, QuotaGovernor};
pub use sequence::{parse_sequences, TargetSequence, Template};
