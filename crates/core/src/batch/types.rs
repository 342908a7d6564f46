//! Types for the batch orchestrator.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::modeling::JobState;

/// Errors that reject a batch before any submission is attempted.
#[derive(Debug, Error)]
pub enum BatchError {
    /// No target sequences were provided.
    #[error("no target sequences provided")]
    EmptyBatch,

    /// Two input sequences share a name; each sequence maps to exactly
    /// one job.
    #[error("duplicate target sequence name: {0}")]
    DuplicateSequence(String),
}

/// Why a sequence's lifecycle slot failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials rejected. Aborts the whole batch.
    Authentication,
    /// The service rejected this sequence as malformed.
    Validation,
    /// Transient network failure persisted past the retry budget.
    Network,
    /// Never reached a terminal state within the poll budget.
    Timeout,
    /// The service reported the job failed, or completed without models.
    Service,
    /// Artifact write failed.
    Write,
    /// The batch stopped before this job finished.
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Authentication => "authentication",
            FailureKind::Validation => "validation",
            FailureKind::Network => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::Service => "service",
            FailureKind::Write => "write",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

/// One tracked remote job.
#[derive(Debug, Clone)]
pub struct Job {
    /// Local identifier, assigned at submission.
    pub id: Uuid,
    /// Name of the sequence this job models.
    pub sequence_name: String,
    /// Cluster label used for output placement.
    pub cluster_label: String,
    /// Remote project identifier; never changes once assigned.
    pub project_id: String,
    /// Last observed remote state.
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    /// Status queries issued so far, counted against the poll budget.
    pub poll_attempts: u32,
    /// Last transient poll warning, if any.
    pub warning: Option<String>,
}

/// Lifecycle slot for one target sequence. Transitions are monotonic;
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone)]
pub enum SlotState {
    /// Waiting for a submission worker.
    Queued,
    /// A worker is submitting (or retrying) this sequence.
    Submitting { attempt: u32 },
    /// Submitted; the poller is tracking the remote job.
    Polling { job: Job },
    /// Artifacts materialized on disk.
    Completed {
        project_id: String,
        written: Vec<PathBuf>,
    },
    /// Terminal failure for this sequence only.
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl SlotState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SlotState::Completed { .. } | SlotState::Failed { .. })
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            SlotState::Queued => "queued",
            SlotState::Submitting { .. } => "submitting",
            SlotState::Polling { .. } => "polling",
            SlotState::Completed { .. } => "completed",
            SlotState::Failed { .. } => "failed",
        }
    }
}

/// Outcome for one sequence in the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SequenceOutcome {
    Completed {
        project_id: String,
        written: Vec<PathBuf>,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

/// Final per-sequence outcome summary for a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Outcome per sequence name. Every input sequence has an entry.
    pub outcomes: HashMap<String, SequenceOutcome>,
    /// Set when the batch was aborted (authentication failure or cancel).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn completed_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, SequenceOutcome::Completed { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, SequenceOutcome::Failed { .. }))
            .count()
    }

    pub fn outcome(&self, sequence_name: &str) -> Option<&SequenceOutcome> {
        self.outcomes.get(sequence_name)
    }
}
