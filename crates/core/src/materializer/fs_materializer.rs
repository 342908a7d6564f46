//! File system materializer implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::error::MaterializeError;
use super::traits::Materializer;
use super::types::{MaterializeJob, MaterializeResult};

/// Materializer writing artifacts under a fixed output root.
pub struct FsMaterializer {
    root: PathBuf,
}

impl FsMaterializer {
    /// Create a materializer rooted at the given output directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Replace characters that are unsafe in filenames (keeps structure
    /// viewer compatibility) with underscores.
    fn sanitize(component: &str) -> String {
        component
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Ensure a directory exists. Concurrent creation of the same
    /// directory is not an error.
    async fn ensure_dir(path: &Path) -> Result<(), MaterializeError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| MaterializeError::DirectoryCreationFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Write one artifact, overwriting any previous content. A failed
    /// write is retried once before surfacing.
    async fn write_artifact(path: &Path, payload: &[u8]) -> Result<(), MaterializeError> {
        if let Err(first) = fs::write(path, payload).await {
            warn!(
                path = %path.display(),
                error = %first,
                "artifact write failed, retrying once"
            );
            fs::write(path, payload)
                .await
                .map_err(|e| MaterializeError::WriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }
}

#[async_trait]
impl Materializer for FsMaterializer {
    fn name(&self) -> &str {
        "fs"
    }

    async fn materialize(
        &self,
        job: &MaterializeJob,
    ) -> Result<MaterializeResult, MaterializeError> {
        if job.artifacts.is_empty() {
            return Err(MaterializeError::NoArtifacts);
        }

        let label = Self::sanitize(&job.cluster_label);
        let cluster_dir = self.root.join(format!("cluster_{}_model", label));

        let mut written = Vec::with_capacity(job.artifacts.len());
        for artifact in &job.artifacts {
            let dir = cluster_dir.join(artifact.format.subdirectory());
            Self::ensure_dir(&dir).await?;

            let filename = format!(
                "cluster_{}_model_{:03}.{}",
                label,
                artifact.ordinal,
                artifact.format.extension()
            );
            let path = dir.join(filename);
            Self::write_artifact(&path, &artifact.payload).await?;
            debug!(path = %path.display(), "artifact written");
            written.push(path);
        }

        Ok(MaterializeResult { written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modeling::{ArtifactFormat, ModelArtifact};
    use tempfile::TempDir;

    fn artifact(format: ArtifactFormat, ordinal: u32, payload: &str) -> ModelArtifact {
        ModelArtifact {
            format,
            ordinal,
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_materialize_writes_cluster_layout() {
        let temp = TempDir::new().unwrap();
        let materializer = FsMaterializer::new(temp.path());

        let job = MaterializeJob {
            cluster_label: "0".to_string(),
            artifacts: vec![
                artifact(ArtifactFormat::Pdb, 1, "ATOM 1"),
                artifact(ArtifactFormat::Cif, 1, "data_model_1"),
                artifact(ArtifactFormat::Pdb, 2, "ATOM 2"),
            ],
        };

        let result = materializer.materialize(&job).await.unwrap();
        assert_eq!(result.written.len(), 3);

        let pdb_dir = temp.path().join("cluster_0_model/PDB");
        let cif_dir = temp.path().join("cluster_0_model/CIF");
        assert!(pdb_dir.join("cluster_0_model_001.pdb").exists());
        assert!(pdb_dir.join("cluster_0_model_002.pdb").exists());
        assert!(cif_dir.join("cluster_0_model_001.cif").exists());

        let content = fs::read_to_string(pdb_dir.join("cluster_0_model_002.pdb"))
            .await
            .unwrap();
        assert_eq!(content, "ATOM 2");
    }

    #[tokio::test]
    async fn test_materialize_twice_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let materializer = FsMaterializer::new(temp.path());

        let job = MaterializeJob {
            cluster_label: "3".to_string(),
            artifacts: vec![artifact(ArtifactFormat::Pdb, 1, "ATOM 1")],
        };

        let first = materializer.materialize(&job).await.unwrap();
        let second = materializer.materialize(&job).await.unwrap();
        assert_eq!(first.written, second.written);

        // Exactly one file in the PDB subdirectory, same content.
        let pdb_dir = temp.path().join("cluster_3_model/PDB");
        let mut entries = fs::read_dir(&pdb_dir).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);

        let content = fs::read_to_string(pdb_dir.join("cluster_3_model_001.pdb"))
            .await
            .unwrap();
        assert_eq!(content, "ATOM 1");
    }

    #[tokio::test]
    async fn test_concurrent_jobs_share_cluster_directory() {
        let temp = TempDir::new().unwrap();
        let materializer = std::sync::Arc::new(FsMaterializer::new(temp.path()));

        let a = {
            let materializer = std::sync::Arc::clone(&materializer);
            tokio::spawn(async move {
                materializer
                    .materialize(&MaterializeJob {
                        cluster_label: "7".to_string(),
                        artifacts: vec![artifact(ArtifactFormat::Pdb, 1, "A")],
                    })
                    .await
            })
        };
        let b = {
            let materializer = std::sync::Arc::clone(&materializer);
            tokio::spawn(async move {
                materializer
                    .materialize(&MaterializeJob {
                        cluster_label: "7".to_string(),
                        artifacts: vec![artifact(ArtifactFormat::Cif, 1, "B")],
                    })
                    .await
            })
        };

        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert!(temp.path().join("cluster_7_model/PDB").exists());
        assert!(temp.path().join("cluster_7_model/CIF").exists());
    }

    #[tokio::test]
    async fn test_label_is_sanitized() {
        let temp = TempDir::new().unwrap();
        let materializer = FsMaterializer::new(temp.path());

        let job = MaterializeJob {
            cluster_label: "a/b c".to_string(),
            artifacts: vec![artifact(ArtifactFormat::Pdb, 1, "ATOM")],
        };

        let result = materializer.materialize(&job).await.unwrap();
        assert!(result.written[0].ends_with("cluster_a_b_c_model/PDB/cluster_a_b_c_model_001.pdb"));
    }

    #[tokio::test]
    async fn test_empty_job_is_an_error() {
        let temp = TempDir::new().unwrap();
        let materializer = FsMaterializer::new(temp.path());

        let job = MaterializeJob {
            cluster_label: "0".to_string(),
            artifacts: vec![],
        };

        let result = materializer.materialize(&job).await;
        assert!(matches!(result, Err(MaterializeError::NoArtifacts)));
    }
}
