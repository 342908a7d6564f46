//! Input data model for a modeling batch.
//!
//! A batch consists of many target sequences modeled against one shared
//! template. Sequences usually arrive as FASTA text; record names carry a
//! cluster label (`cluster_<n>_...`) that decides where the resulting
//! models are filed.

mod fasta;
mod types;

pub use fasta::{extract_cluster_label, parse_sequences};
pub use types::{TargetSequence, Template};
