//! Trait definitions for the materializer module.

use async_trait::async_trait;

use super::error::MaterializeError;
use super::types::{MaterializeJob, MaterializeResult};

/// A materializer that can file a completed job's artifacts.
#[async_trait]
pub trait Materializer: Send + Sync {
    /// Returns the name of this materializer implementation.
    fn name(&self) -> &str;

    /// Write every artifact of a completed job. Must be idempotent:
    /// materializing the same job twice yields the same file set.
    async fn materialize(&self, job: &MaterializeJob)
        -> Result<MaterializeResult, MaterializeError>;
}
