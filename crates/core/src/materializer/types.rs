//! Types for the materializer module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::modeling::ModelArtifact;

/// Artifacts of one completed job, keyed to the cluster they belong to.
#[derive(Debug, Clone)]
pub struct MaterializeJob {
    /// Cluster label the sequence was grouped under.
    pub cluster_label: String,
    /// Artifacts to write, each carrying its format and model ordinal.
    pub artifacts: Vec<ModelArtifact>,
}

/// Files written for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializeResult {
    pub written: Vec<PathBuf>,
}
