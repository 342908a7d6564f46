//! Testing utilities and mock implementations for E2E tests.
//!
//! Provides a controllable mock of the remote modeling service so batch
//! lifecycles can be tested without network access.

mod mock_modeling_service;

pub use mock_modeling_service::{MockJobScript, MockModelingService, RecordedSubmit};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::sequence::{extract_cluster_label, TargetSequence, Template};

    /// Create a target sequence, deriving the cluster label from the name
    /// the way FASTA parsing does.
    pub fn target_sequence(name: &str) -> TargetSequence {
        let cluster_label = extract_cluster_label(name);
        TargetSequence::new(name, "MKVLATGQRAACDE", cluster_label)
    }

    /// Create a small template structure.
    pub fn template() -> Template {
        Template::new(
            "1CRN",
            "ATOM      1  N   THR A   1      17.047  14.099   3.625\nEND\n",
        )
    }
}
