//! Types for the remote modeling service boundary.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequence::{TargetSequence, Template};

/// Errors that can occur talking to the remote modeling service.
#[derive(Debug, Error)]
pub enum ModelingError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Input rejected by service: {0}")]
    InvalidInput(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Request rate rejected by service")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,
}

impl ModelingError {
    /// Whether the operation may be re-attempted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::RateLimited | Self::ServerError(_) | Self::Timeout
        )
    }

    /// Whether the error means the credentials are bad. Fatal to the
    /// whole batch, never to just one job.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::AuthenticationFailed(_))
    }
}

/// State of a remote modeling job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, waiting to run.
    Pending,
    /// Model building in progress.
    Running,
    /// Finished with model artifacts available.
    Complete,
    /// The service gave up on the job.
    Failed,
}

impl JobState {
    /// Returns the string representation for reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Complete | JobState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            JobState::Pending => 0,
            JobState::Running => 1,
            JobState::Complete | JobState::Failed => 2,
        }
    }

    /// Advance toward a newly reported state. Transitions are monotonic:
    /// a terminal state is kept, and a report of an earlier state (e.g.
    /// `Pending` after `Running` was observed) is ignored.
    pub fn advance(self, reported: JobState) -> JobState {
        if self.is_terminal() || reported.rank() < self.rank() {
            self
        } else {
            reported
        }
    }
}

/// Map the service's reported status string onto a [`JobState`].
///
/// Unknown strings map to `Pending` so the poll budget, not a vocabulary
/// gap, decides the job's fate.
pub fn parse_job_state(status: &str) -> JobState {
    match status {
        "QUEUEING" | "QUEUED" | "PENDING" => JobState::Pending,
        "STARTED" | "RUNNING" => JobState::Running,
        "COMPLETED" => JobState::Complete,
        "FAILED" => JobState::Failed,
        _ => JobState::Pending,
    }
}

/// One modeling request: one target sequence against the shared template.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub sequence: TargetSequence,
    pub template: Arc<Template>,
    /// Title recorded on the remote project.
    pub project_title: String,
}

impl SubmitRequest {
    pub fn new(sequence: TargetSequence, template: Arc<Template>) -> Self {
        let project_title = format!("Batch submission - {}", sequence.name);
        Self {
            sequence,
            template,
            project_title,
        }
    }
}

/// Remote acknowledgement of a created job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    /// Remote project identifier; never changes once assigned.
    pub project_id: String,
}

/// Output format of one model artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Pdb,
    Cif,
}

impl ArtifactFormat {
    /// Subdirectory this format is filed under.
    pub fn subdirectory(&self) -> &'static str {
        match self {
            ArtifactFormat::Pdb => "PDB",
            ArtifactFormat::Cif => "CIF",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Pdb => "pdb",
            ArtifactFormat::Cif => "cif",
        }
    }
}

/// Reference to one downloadable model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub url: String,
    pub format: ArtifactFormat,
    /// 1-based model number within the job.
    pub ordinal: u32,
}

/// One structural output of a completed job.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub format: ArtifactFormat,
    pub ordinal: u32,
    pub payload: Vec<u8>,
}

/// Status summary for one remote project.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub status: JobState,
    /// References to the job's model artifacts; populated on completion.
    pub artifacts: Vec<ArtifactRef>,
}

/// Trait for remote modeling service backends.
#[async_trait]
pub trait ModelingService: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Create a modeling job; returns the remote project identifier.
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResult, ModelingError>;

    /// Query job status. Complete summaries carry the artifact references.
    async fn project_status(&self, project_id: &str) -> Result<ProjectSummary, ModelingError>;

    /// Download one artifact payload.
    async fn fetch_artifact(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ModelingError>;
}
