//! Sequence and template types.

use serde::{Deserialize, Serialize};

/// One protein sequence to be modeled against the shared template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSequence {
    /// Record name as it appeared in the input.
    pub name: String,
    /// Residue string, cleaned of non-sequence characters.
    pub residues: String,
    /// Cluster/group label derived from the record name, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_label: Option<String>,
}

impl TargetSequence {
    /// Create a sequence with an explicit cluster label.
    pub fn new(
        name: impl Into<String>,
        residues: impl Into<String>,
        cluster_label: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            residues: residues.into(),
            cluster_label,
        }
    }

    /// Label used for output placement. Sequences without a recognizable
    /// cluster are filed under "unknown".
    pub fn placement_label(&self) -> &str {
        self.cluster_label.as_deref().unwrap_or("unknown")
    }
}

/// The structural reference shared read-only by every job in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Identifier for logging (e.g. the PDB id or source filename).
    pub id: String,
    /// Raw coordinate file content, sent verbatim to the service.
    pub coordinates: String,
}

impl Template {
    pub fn new(id: impl Into<String>, coordinates: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            coordinates: coordinates.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_label_with_cluster() {
        let seq = TargetSequence::new("cluster_3_medoid", "MKV", Some("3".to_string()));
        assert_eq!(seq.placement_label(), "3");
    }

    #[test]
    fn test_placement_label_without_cluster() {
        let seq = TargetSequence::new("lysozyme", "MKV", None);
        assert_eq!(seq.placement_label(), "unknown");
    }

    #[test]
    fn test_sequence_serialization() {
        let seq = TargetSequence::new("cluster_0_medoid", "MKVLAT", Some("0".to_string()));
        let json = serde_json::to_string(&seq).unwrap();
        let parsed: TargetSequence = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, seq);
    }
}
