//! Mock modeling service for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::modeling::{
    ArtifactFormat, ArtifactRef, JobState, ModelingError, ModelingService, ProjectSummary,
    SubmitRequest, SubmitResult,
};

/// A recorded submission for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    pub sequence_name: String,
    pub project_id: String,
    pub project_title: String,
    /// When the submission reached the service (virtual clock under
    /// paused-time tests).
    pub at: Instant,
}

/// Scripted behavior for one sequence's job.
#[derive(Debug, Clone)]
pub struct MockJobScript {
    /// Status polls answered before the job reaches its end state.
    pub polls_until_complete: u32,
    /// Models reported on completion (each carries a PDB and a CIF
    /// artifact).
    pub model_count: usize,
    /// Report `FAILED` instead of completing.
    pub fail_remotely: bool,
    /// Keep answering `Pending` forever.
    pub never_complete: bool,
}

impl Default for MockJobScript {
    fn default() -> Self {
        Self {
            polls_until_complete: 1,
            model_count: 1,
            fail_remotely: false,
            never_complete: false,
        }
    }
}

/// Internal state for one mock project.
#[derive(Debug)]
struct MockProject {
    sequence_name: String,
    polls: u32,
}

/// Mock implementation of the [`ModelingService`] trait.
///
/// Provides controllable behavior for testing:
/// - Record submissions (with admission timestamps) for assertions
/// - Script per-sequence job progression
/// - Inject submission/status/fetch failures
#[derive(Debug, Default)]
pub struct MockModelingService {
    submissions: Arc<RwLock<Vec<RecordedSubmit>>>,
    projects: Arc<RwLock<HashMap<String, MockProject>>>,
    scripts: Arc<RwLock<HashMap<String, MockJobScript>>>,
    /// Per-sequence submission error, consumed on use.
    submit_errors: Arc<RwLock<HashMap<String, ModelingError>>>,
    /// If set, the next status query fails with this error.
    next_status_error: Arc<RwLock<Option<ModelingError>>>,
    /// If set, the next artifact fetch fails with this error.
    next_fetch_error: Arc<RwLock<Option<ModelingError>>>,
    project_counter: Arc<RwLock<u32>>,
}

impl MockModelingService {
    /// Create a new mock service. Unscripted sequences complete on the
    /// first poll with a single model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the job behavior for one sequence.
    pub async fn script(&self, sequence_name: &str, script: MockJobScript) {
        self.scripts
            .write()
            .await
            .insert(sequence_name.to_string(), script);
    }

    /// Configure the submission of one sequence to fail with the given
    /// error. The error is consumed on use, so a retry succeeds.
    pub async fn set_submit_error(&self, sequence_name: &str, error: ModelingError) {
        self.submit_errors
            .write()
            .await
            .insert(sequence_name.to_string(), error);
    }

    /// Configure the next status query to fail with the given error.
    pub async fn set_next_status_error(&self, error: ModelingError) {
        *self.next_status_error.write().await = Some(error);
    }

    /// Configure the next artifact fetch to fail with the given error.
    pub async fn set_next_fetch_error(&self, error: ModelingError) {
        *self.next_fetch_error.write().await = Some(error);
    }

    /// Get all recorded submissions.
    pub async fn submissions(&self) -> Vec<RecordedSubmit> {
        self.submissions.read().await.clone()
    }

    pub async fn submission_count(&self) -> usize {
        self.submissions.read().await.len()
    }

    /// Status polls answered for a project so far.
    pub async fn poll_count(&self, project_id: &str) -> u32 {
        self.projects
            .read()
            .await
            .get(project_id)
            .map(|p| p.polls)
            .unwrap_or(0)
    }

    /// Deterministic payload served for an artifact URL.
    pub fn payload_for(url: &str) -> Vec<u8> {
        format!("MOCK-MODEL {}", url).into_bytes()
    }

    fn artifact_refs(project_id: &str, model_count: usize) -> Vec<ArtifactRef> {
        let mut artifacts = Vec::with_capacity(model_count * 2);
        for ordinal in 1..=model_count as u32 {
            artifacts.push(ArtifactRef {
                url: format!("https://mock.invalid/{}/model_{:02}.pdb", project_id, ordinal),
                format: ArtifactFormat::Pdb,
                ordinal,
            });
            artifacts.push(ArtifactRef {
                url: format!("https://mock.invalid/{}/model_{:02}.cif", project_id, ordinal),
                format: ArtifactFormat::Cif,
                ordinal,
            });
        }
        artifacts
    }
}

#[async_trait]
impl ModelingService for MockModelingService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResult, ModelingError> {
        let name = request.sequence.name.clone();

        if let Some(error) = self.submit_errors.write().await.remove(&name) {
            return Err(error);
        }

        let project_id = {
            let mut counter = self.project_counter.write().await;
            *counter += 1;
            format!("mock-project-{}", *counter)
        };

        self.submissions.write().await.push(RecordedSubmit {
            sequence_name: name.clone(),
            project_id: project_id.clone(),
            project_title: request.project_title.clone(),
            at: Instant::now(),
        });

        self.projects.write().await.insert(
            project_id.clone(),
            MockProject {
                sequence_name: name,
                polls: 0,
            },
        );

        Ok(SubmitResult { project_id })
    }

    async fn project_status(&self, project_id: &str) -> Result<ProjectSummary, ModelingError> {
        if let Some(error) = self.next_status_error.write().await.take() {
            return Err(error);
        }

        let (sequence_name, polls) = {
            let mut projects = self.projects.write().await;
            let project = projects
                .get_mut(project_id)
                .ok_or_else(|| ModelingError::ProjectNotFound(project_id.to_string()))?;
            project.polls += 1;
            (project.sequence_name.clone(), project.polls)
        };

        let script = self
            .scripts
            .read()
            .await
            .get(&sequence_name)
            .cloned()
            .unwrap_or_default();

        if script.never_complete {
            return Ok(ProjectSummary {
                status: JobState::Pending,
                artifacts: vec![],
            });
        }

        if polls >= script.polls_until_complete {
            if script.fail_remotely {
                return Ok(ProjectSummary {
                    status: JobState::Failed,
                    artifacts: vec![],
                });
            }
            return Ok(ProjectSummary {
                status: JobState::Complete,
                artifacts: Self::artifact_refs(project_id, script.model_count),
            });
        }

        // Show some progress on the poll before completion.
        let status = if polls + 1 >= script.polls_until_complete {
            JobState::Running
        } else {
            JobState::Pending
        };
        Ok(ProjectSummary {
            status,
            artifacts: vec![],
        })
    }

    async fn fetch_artifact(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ModelingError> {
        if let Some(error) = self.next_fetch_error.write().await.take() {
            return Err(error);
        }
        Ok(Self::payload_for(&artifact.url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn request(name: &str) -> SubmitRequest {
        SubmitRequest::new(fixtures::target_sequence(name), Arc::new(fixtures::template()))
    }

    #[tokio::test]
    async fn test_submit_records_and_assigns_project_ids() {
        let service = MockModelingService::new();

        let first = service.submit(&request("cluster_0_a")).await.unwrap();
        let second = service.submit(&request("cluster_0_b")).await.unwrap();
        assert_ne!(first.project_id, second.project_id);

        let submissions = service.submissions().await;
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[0].sequence_name, "cluster_0_a");
    }

    #[tokio::test]
    async fn test_default_script_completes_on_first_poll() {
        let service = MockModelingService::new();
        let result = service.submit(&request("cluster_0_a")).await.unwrap();

        let summary = service.project_status(&result.project_id).await.unwrap();
        assert_eq!(summary.status, JobState::Complete);
        // One model, both formats.
        assert_eq!(summary.artifacts.len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_progression() {
        let service = MockModelingService::new();
        service
            .script(
                "cluster_0_a",
                MockJobScript {
                    polls_until_complete: 3,
                    model_count: 2,
                    ..Default::default()
                },
            )
            .await;
        let result = service.submit(&request("cluster_0_a")).await.unwrap();

        let summary = service.project_status(&result.project_id).await.unwrap();
        assert_eq!(summary.status, JobState::Pending);
        let summary = service.project_status(&result.project_id).await.unwrap();
        assert_eq!(summary.status, JobState::Running);
        let summary = service.project_status(&result.project_id).await.unwrap();
        assert_eq!(summary.status, JobState::Complete);
        assert_eq!(summary.artifacts.len(), 4);
    }

    #[tokio::test]
    async fn test_submit_error_is_consumed() {
        let service = MockModelingService::new();
        service
            .set_submit_error("cluster_0_a", ModelingError::ServerError("HTTP 502".into()))
            .await;

        let result = service.submit(&request("cluster_0_a")).await;
        assert!(result.is_err());

        let result = service.submit(&request("cluster_0_a")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_project_not_found() {
        let service = MockModelingService::new();
        let result = service.project_status("nope").await;
        assert!(matches!(result, Err(ModelingError::ProjectNotFound(_))));
    }

    #[tokio::test]
    async fn test_fetch_artifact_is_deterministic() {
        let service = MockModelingService::new();
        let artifact = ArtifactRef {
            url: "https://mock.invalid/p/model_01.pdb".into(),
            format: ArtifactFormat::Pdb,
            ordinal: 1,
        };
        let first = service.fetch_artifact(&artifact).await.unwrap();
        let second = service.fetch_artifact(&artifact).await.unwrap();
        assert_eq!(first, second);
    }
}
