//! SWISS-MODEL user-template API client.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::ServiceConfig;

use super::types::{
    parse_job_state, ArtifactFormat, ArtifactRef, ModelingError, ModelingService, ProjectSummary,
    SubmitRequest, SubmitResult,
};

/// Client for the SWISS-MODEL user-template modeling API.
pub struct SwissModelClient {
    client: Client,
    config: ServiceConfig,
}

impl SwissModelClient {
    /// Create a new client.
    pub fn new(config: ServiceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.config.api_key)
    }

    fn map_transport_error(e: reqwest::Error) -> ModelingError {
        if e.is_timeout() {
            ModelingError::Timeout
        } else if e.is_connect() {
            ModelingError::ConnectionFailed(e.to_string())
        } else {
            ModelingError::ApiError(e.to_string())
        }
    }

    /// Classify a non-success response by status code.
    async fn error_from_response(response: reqwest::Response) -> ModelingError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.chars().take(200).collect();

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                ModelingError::AuthenticationFailed(detail)
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ModelingError::InvalidInput(detail)
            }
            StatusCode::NOT_FOUND => ModelingError::ProjectNotFound(detail),
            StatusCode::TOO_MANY_REQUESTS => ModelingError::RateLimited,
            s if s.is_server_error() => {
                ModelingError::ServerError(format!("HTTP {}: {}", s, detail))
            }
            s => ModelingError::ApiError(format!("HTTP {}: {}", s, detail)),
        }
    }
}

/// Project creation response.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    project_id: String,
}

/// Model summary response. Fields beyond these are ignored; the wire
/// schema is owned by the service.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    status: String,
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    coordinates_url: Option<String>,
    #[serde(default)]
    modelcif_url: Option<String>,
}

impl SummaryResponse {
    fn into_summary(self) -> ProjectSummary {
        let status = parse_job_state(&self.status);

        let mut artifacts = Vec::new();
        for (idx, model) in self.models.into_iter().enumerate() {
            let ordinal = (idx + 1) as u32;
            if let Some(url) = model.coordinates_url {
                artifacts.push(ArtifactRef {
                    url,
                    format: ArtifactFormat::Pdb,
                    ordinal,
                });
            }
            if let Some(url) = model.modelcif_url {
                artifacts.push(ArtifactRef {
                    url,
                    format: ArtifactFormat::Cif,
                    ordinal,
                });
            }
        }

        ProjectSummary { status, artifacts }
    }
}

/// Gunzip a payload when the URL names a compressed object.
fn decode_payload(url: &str, bytes: Vec<u8>) -> Result<Vec<u8>, ModelingError> {
    let path = url.split('?').next().unwrap_or(url);
    if !path.ends_with(".gz") {
        return Ok(bytes);
    }

    let mut decoder = GzDecoder::new(bytes.as_slice());
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| ModelingError::ApiError(format!("Failed to decompress artifact: {}", e)))?;
    Ok(decoded)
}

#[async_trait]
impl ModelingService for SwissModelClient {
    fn name(&self) -> &str {
        "swissmodel"
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResult, ModelingError> {
        let url = format!("{}/user_template", self.base_url());
        let body = json!({
            "target_sequences": [request.sequence.residues],
            "template_coordinates": request.template.coordinates,
            "project_title": request.project_title,
        });

        debug!(sequence = %request.sequence.name, "submitting modeling job");

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ModelingError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(SubmitResult {
            project_id: parsed.project_id,
        })
    }

    async fn project_status(&self, project_id: &str) -> Result<ProjectSummary, ModelingError> {
        let url = format!("{}/project/{}/models/summary/", self.base_url(), project_id);

        let response = self
            .client
            .get(&url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let parsed: SummaryResponse = response
            .json()
            .await
            .map_err(|e| ModelingError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.into_summary())
    }

    async fn fetch_artifact(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ModelingError> {
        let response = self
            .client
            .get(&artifact.url)
            .header(header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(Self::map_transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ModelingError::ApiError(format!("Failed to read artifact body: {}", e)))?;

        decode_payload(&artifact.url, bytes.to_vec())
    }
}
