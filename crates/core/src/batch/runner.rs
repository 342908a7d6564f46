//! Batch orchestrator implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::materializer::{MaterializeJob, Materializer};
use crate::modeling::{
    JobState, ModelArtifact, ModelingService, ProjectSummary, SubmitRequest,
};
use crate::quota::QuotaGovernor;
use crate::sequence::{TargetSequence, Template};

use super::config::BatchConfig;
use super::types::{BatchError, BatchReport, FailureKind, Job, SequenceOutcome, SlotState};

type SlotTable = Arc<RwLock<HashMap<String, SlotState>>>;

/// State shared between the submission workers and the poller.
struct Shared {
    config: BatchConfig,
    service: Arc<dyn ModelingService>,
    governor: Arc<QuotaGovernor>,
    materializer: Arc<dyn Materializer>,
    template: Arc<Template>,
    slots: SlotTable,
    cancelled: Arc<AtomicBool>,
    abort_reason: RwLock<Option<String>>,
}

/// The batch orchestrator - drives every target sequence through
/// submission, polling and materialization.
pub struct BatchOrchestrator {
    config: BatchConfig,
    service: Arc<dyn ModelingService>,
    governor: Arc<QuotaGovernor>,
    materializer: Arc<dyn Materializer>,
    cancelled: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl BatchOrchestrator {
    /// Create a new orchestrator. The governor is shared by every
    /// network-issuing path (submission, status queries, artifact
    /// fetches).
    pub fn new(
        config: BatchConfig,
        service: Arc<dyn ModelingService>,
        governor: Arc<QuotaGovernor>,
        materializer: Arc<dyn Materializer>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            service,
            governor,
            materializer,
            cancelled: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Signal the batch to stop: workers stop picking up new sequences
    /// and the poller abandons jobs that are not yet terminal. Abandoned
    /// sequences are reported as failed, never silently dropped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Run one batch to completion and report every sequence's outcome.
    ///
    /// Partial failure is not fatal: one sequence's permanent failure
    /// does not halt the others. Only authentication failure (or an
    /// external [`cancel`](Self::cancel)) stops the batch early, and even
    /// then the report enumerates every sequence.
    pub async fn run(
        &self,
        sequences: Vec<TargetSequence>,
        template: Template,
    ) -> Result<BatchReport, BatchError> {
        if sequences.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        // One lifecycle slot per sequence; duplicates are rejected before
        // anything is submitted.
        let mut slots = HashMap::with_capacity(sequences.len());
        for sequence in &sequences {
            if slots
                .insert(sequence.name.clone(), SlotState::Queued)
                .is_some()
            {
                return Err(BatchError::DuplicateSequence(sequence.name.clone()));
            }
        }

        let started = Instant::now();
        self.cancelled.store(false, Ordering::SeqCst);

        let shared = Arc::new(Shared {
            config: self.config.clone(),
            service: Arc::clone(&self.service),
            governor: Arc::clone(&self.governor),
            materializer: Arc::clone(&self.materializer),
            template: Arc::new(template),
            slots: Arc::new(RwLock::new(slots)),
            cancelled: Arc::clone(&self.cancelled),
            abort_reason: RwLock::new(None),
        });

        info!(
            sequences = sequences.len(),
            workers = self.config.worker_count,
            template = %shared.template.id,
            "starting batch"
        );

        // The poller starts alongside the workers so early completions
        // are picked up while later sequences are still being submitted.
        let poller = {
            let shared = Arc::clone(&shared);
            let shutdown_rx = self.shutdown_tx.subscribe();
            tokio::spawn(async move { Self::poll_loop(shared, shutdown_rx).await })
        };

        let queue = Arc::new(Mutex::new(VecDeque::from(sequences)));
        let workers: Vec<_> = (0..self.config.worker_count.max(1))
            .map(|worker| {
                let shared = Arc::clone(&shared);
                let queue = Arc::clone(&queue);
                tokio::spawn(async move { Self::submission_worker(worker, shared, queue).await })
            })
            .collect();
        join_all(workers).await;
        debug!("all submission workers finished");

        // Wait for every slot to reach a terminal state.
        loop {
            if shared.cancelled.load(Ordering::SeqCst) {
                break;
            }
            if Self::all_terminal(&shared.slots).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let _ = self.shutdown_tx.send(());
        let _ = poller.await;
        Self::finalize_remaining(&shared).await;

        let aborted = {
            let reason = shared.abort_reason.read().await.clone();
            reason.or_else(|| {
                if shared.cancelled.load(Ordering::SeqCst) {
                    Some("batch cancelled".to_string())
                } else {
                    None
                }
            })
        };

        let slots = shared.slots.read().await;
        let outcomes: HashMap<String, SequenceOutcome> = slots
            .iter()
            .map(|(name, slot)| {
                let outcome = match slot {
                    SlotState::Completed {
                        project_id,
                        written,
                    } => SequenceOutcome::Completed {
                        project_id: project_id.clone(),
                        written: written.clone(),
                    },
                    SlotState::Failed { kind, message } => SequenceOutcome::Failed {
                        kind: *kind,
                        message: message.clone(),
                    },
                    other => SequenceOutcome::Failed {
                        kind: FailureKind::Cancelled,
                        message: format!("batch ended while {}", other.state_name()),
                    },
                };
                (name.clone(), outcome)
            })
            .collect();

        let report = BatchReport {
            outcomes,
            aborted,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            completed = report.completed_count(),
            failed = report.failed_count(),
            "batch finished"
        );

        Ok(report)
    }

    /// One submission worker: drain the shared queue until it is empty or
    /// the batch is stopped.
    async fn submission_worker(
        worker: usize,
        shared: Arc<Shared>,
        queue: Arc<Mutex<VecDeque<TargetSequence>>>,
    ) {
        debug!(worker, "submission worker started");
        loop {
            if shared.cancelled.load(Ordering::SeqCst) {
                break;
            }
            let sequence = { queue.lock().await.pop_front() };
            let Some(sequence) = sequence else {
                break;
            };
            Self::submit_one(&shared, sequence).await;
        }
        debug!(worker, "submission worker stopped");
    }

    /// Submit one sequence, retrying transient failures with bounded
    /// exponential backoff.
    async fn submit_one(shared: &Shared, sequence: TargetSequence) {
        let name = sequence.name.clone();
        let cluster_label = sequence.placement_label().to_string();
        let request = SubmitRequest::new(sequence, Arc::clone(&shared.template));
        let retry = &shared.config.retry;
        let max_attempts = retry.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            if shared.cancelled.load(Ordering::SeqCst) {
                Self::set_slot(
                    &shared.slots,
                    &name,
                    SlotState::Failed {
                        kind: FailureKind::Cancelled,
                        message: "batch stopped before submission".to_string(),
                    },
                )
                .await;
                return;
            }

            Self::set_slot(&shared.slots, &name, SlotState::Submitting { attempt }).await;
            shared.governor.acquire().await;

            match shared.service.submit(&request).await {
                Ok(result) => {
                    let job = Job {
                        id: Uuid::new_v4(),
                        sequence_name: name.clone(),
                        cluster_label: cluster_label.clone(),
                        project_id: result.project_id,
                        state: JobState::Pending,
                        submitted_at: Utc::now(),
                        last_polled_at: None,
                        poll_attempts: 0,
                        warning: None,
                    };
                    info!(
                        sequence = %name,
                        job = %job.id,
                        project = %job.project_id,
                        "modeling job submitted"
                    );
                    Self::set_slot(&shared.slots, &name, SlotState::Polling { job }).await;
                    return;
                }
                Err(e) if e.is_authentication() => {
                    Self::abort(shared, format!("authentication failed: {}", e)).await;
                    Self::set_slot(
                        &shared.slots,
                        &name,
                        SlotState::Failed {
                            kind: FailureKind::Authentication,
                            message: e.to_string(),
                        },
                    )
                    .await;
                    return;
                }
                Err(e) if !e.is_retryable() => {
                    warn!(sequence = %name, error = %e, "submission rejected");
                    Self::set_slot(
                        &shared.slots,
                        &name,
                        SlotState::Failed {
                            kind: FailureKind::Validation,
                            message: e.to_string(),
                        },
                    )
                    .await;
                    return;
                }
                Err(e) => {
                    warn!(
                        sequence = %name,
                        attempt,
                        error = %e,
                        "transient submission failure"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(retry.delay_for_attempt(attempt)).await;
                    } else {
                        Self::set_slot(
                            &shared.slots,
                            &name,
                            SlotState::Failed {
                                kind: FailureKind::Network,
                                message: format!(
                                    "submission failed after {} attempts: {}",
                                    attempt, e
                                ),
                            },
                        )
                        .await;
                    }
                }
            }
        }
    }

    /// The poller: sweep all outstanding jobs on a fixed tick until told
    /// to shut down.
    async fn poll_loop(shared: Arc<Shared>, mut shutdown_rx: broadcast::Receiver<()>) {
        debug!("poller started");
        let interval = Duration::from_millis(shared.config.poll_interval_ms);
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    if shared.cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    Self::sweep(&shared).await;
                }
            }
        }
        debug!("poller stopped");
    }

    /// Poll every outstanding job once. The slot lock is not held across
    /// network calls.
    async fn sweep(shared: &Shared) {
        let outstanding: Vec<Job> = {
            let slots = shared.slots.read().await;
            slots
                .values()
                .filter_map(|slot| match slot {
                    SlotState::Polling { job } => Some(job.clone()),
                    _ => None,
                })
                .collect()
        };

        for job in outstanding {
            if shared.cancelled.load(Ordering::SeqCst) {
                return;
            }
            Self::poll_one(shared, job).await;
        }
    }

    /// Poll one job and advance its slot.
    async fn poll_one(shared: &Shared, mut job: Job) {
        shared.governor.acquire().await;
        job.poll_attempts += 1;
        job.last_polled_at = Some(Utc::now());

        let summary = match shared.service.project_status(&job.project_id).await {
            Ok(summary) => summary,
            Err(e) if e.is_authentication() => {
                Self::abort(shared, format!("authentication failed: {}", e)).await;
                Self::set_slot(
                    &shared.slots,
                    &job.sequence_name,
                    SlotState::Failed {
                        kind: FailureKind::Authentication,
                        message: e.to_string(),
                    },
                )
                .await;
                return;
            }
            Err(e) => {
                // Transient blip: stay outstanding and let the next tick
                // retry, but count it against the poll budget.
                warn!(project = %job.project_id, error = %e, "status query failed");
                job.warning = Some(e.to_string());
                Self::store_or_timeout(shared, job).await;
                return;
            }
        };

        job.state = job.state.advance(summary.status);
        match job.state {
            JobState::Failed => {
                warn!(
                    sequence = %job.sequence_name,
                    project = %job.project_id,
                    "service reported the modeling job failed"
                );
                Self::set_slot(
                    &shared.slots,
                    &job.sequence_name,
                    SlotState::Failed {
                        kind: FailureKind::Service,
                        message: "service reported the modeling job failed".to_string(),
                    },
                )
                .await;
            }
            JobState::Complete => {
                if summary.artifacts.is_empty() {
                    warn!(
                        sequence = %job.sequence_name,
                        project = %job.project_id,
                        "job completed with no model artifacts"
                    );
                    Self::set_slot(
                        &shared.slots,
                        &job.sequence_name,
                        SlotState::Failed {
                            kind: FailureKind::Service,
                            message: "job completed with no model artifacts".to_string(),
                        },
                    )
                    .await;
                    return;
                }

                match Self::retrieve_artifacts(shared, &summary).await {
                    Ok(artifacts) => Self::materialize(shared, job, artifacts).await,
                    Err(e) => {
                        // Artifacts are not retrievable yet, so the job is
                        // not complete; retry on the next tick.
                        warn!(
                            project = %job.project_id,
                            error = %e,
                            "artifact fetch failed"
                        );
                        job.warning = Some(e.to_string());
                        Self::store_or_timeout(shared, job).await;
                    }
                }
            }
            JobState::Pending | JobState::Running => {
                debug!(
                    project = %job.project_id,
                    state = job.state.as_str(),
                    attempts = job.poll_attempts,
                    "job not yet terminal"
                );
                Self::store_or_timeout(shared, job).await;
            }
        }
    }

    /// Keep a non-terminal job outstanding, or force it to a timeout
    /// failure once the poll budget is exhausted.
    async fn store_or_timeout(shared: &Shared, job: Job) {
        if job.poll_attempts >= shared.config.max_poll_attempts {
            warn!(
                sequence = %job.sequence_name,
                project = %job.project_id,
                attempts = job.poll_attempts,
                "poll budget exhausted"
            );
            Self::set_slot(
                &shared.slots,
                &job.sequence_name.clone(),
                SlotState::Failed {
                    kind: FailureKind::Timeout,
                    message: format!("no terminal state after {} polls", job.poll_attempts),
                },
            )
            .await;
        } else {
            let name = job.sequence_name.clone();
            Self::set_slot(&shared.slots, &name, SlotState::Polling { job }).await;
        }
    }

    /// Fetch every artifact of a completed job, each admission passing
    /// through the governor.
    async fn retrieve_artifacts(
        shared: &Shared,
        summary: &ProjectSummary,
    ) -> Result<Vec<ModelArtifact>, crate::modeling::ModelingError> {
        let mut artifacts = Vec::with_capacity(summary.artifacts.len());
        for reference in &summary.artifacts {
            shared.governor.acquire().await;
            let payload = shared.service.fetch_artifact(reference).await?;
            artifacts.push(ModelArtifact {
                format: reference.format,
                ordinal: reference.ordinal,
                payload,
            });
        }
        Ok(artifacts)
    }

    /// File a completed job's artifacts and settle its slot.
    async fn materialize(shared: &Shared, job: Job, artifacts: Vec<ModelArtifact>) {
        let materialize_job = MaterializeJob {
            cluster_label: job.cluster_label.clone(),
            artifacts,
        };

        match shared.materializer.materialize(&materialize_job).await {
            Ok(result) => {
                info!(
                    sequence = %job.sequence_name,
                    files = result.written.len(),
                    "job materialized"
                );
                Self::set_slot(
                    &shared.slots,
                    &job.sequence_name,
                    SlotState::Completed {
                        project_id: job.project_id,
                        written: result.written,
                    },
                )
                .await;
            }
            Err(e) => {
                warn!(
                    sequence = %job.sequence_name,
                    error = %e,
                    "failed to materialize artifacts"
                );
                Self::set_slot(
                    &shared.slots,
                    &job.sequence_name,
                    SlotState::Failed {
                        kind: FailureKind::Write,
                        message: e.to_string(),
                    },
                )
                .await;
            }
        }
    }

    /// Record an abort and stop the batch. The first reason wins.
    async fn abort(shared: &Shared, reason: String) {
        warn!(%reason, "aborting batch");
        {
            let mut abort_reason = shared.abort_reason.write().await;
            abort_reason.get_or_insert(reason);
        }
        shared.cancelled.store(true, Ordering::SeqCst);
    }

    /// Replace a slot's state. Terminal states are never overwritten.
    async fn set_slot(slots: &SlotTable, name: &str, next: SlotState) {
        let mut slots = slots.write().await;
        let terminal = slots.get(name).is_some_and(SlotState::is_terminal);
        if terminal {
            debug!(sequence = name, "ignoring transition out of terminal state");
        } else {
            slots.insert(name.to_string(), next);
        }
    }

    async fn all_terminal(slots: &SlotTable) -> bool {
        slots.read().await.values().all(SlotState::is_terminal)
    }

    /// Fail anything still outstanding after the batch stopped, so no
    /// sequence is silently dropped from the report.
    async fn finalize_remaining(shared: &Shared) {
        let mut slots = shared.slots.write().await;
        for (name, slot) in slots.iter_mut() {
            if !slot.is_terminal() {
                let state_name = slot.state_name();
                warn!(sequence = %name, state = state_name, "sequence did not finish");
                *slot = SlotState::Failed {
                    kind: FailureKind::Cancelled,
                    message: format!("batch stopped while {}", state_name),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_table(entries: Vec<(&str, SlotState)>) -> SlotTable {
        Arc::new(RwLock::new(
            entries
                .into_iter()
                .map(|(name, slot)| (name.to_string(), slot))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_set_slot_never_leaves_terminal_state() {
        let slots = slot_table(vec![(
            "seq",
            SlotState::Completed {
                project_id: "p1".into(),
                written: vec![],
            },
        )]);

        BatchOrchestrator::set_slot(&slots, "seq", SlotState::Submitting { attempt: 1 }).await;

        let table = slots.read().await;
        assert!(matches!(
            table.get("seq"),
            Some(SlotState::Completed { .. })
        ));
    }

    #[tokio::test]
    async fn test_set_slot_advances_non_terminal_state() {
        let slots = slot_table(vec![("seq", SlotState::Queued)]);

        BatchOrchestrator::set_slot(&slots, "seq", SlotState::Submitting { attempt: 1 }).await;

        let table = slots.read().await;
        assert!(matches!(
            table.get("seq"),
            Some(SlotState::Submitting { attempt: 1 })
        ));
    }

    #[tokio::test]
    async fn test_all_terminal() {
        let slots = slot_table(vec![
            (
                "a",
                SlotState::Failed {
                    kind: FailureKind::Timeout,
                    message: "budget".into(),
                },
            ),
            ("b", SlotState::Queued),
        ]);
        assert!(!BatchOrchestrator::all_terminal(&slots).await);

        BatchOrchestrator::set_slot(
            &slots,
            "b",
            SlotState::Completed {
                project_id: "p".into(),
                written: vec![],
            },
        )
        .await;
        assert!(BatchOrchestrator::all_terminal(&slots).await);
    }
}
