//! Materializer module for filing model artifacts on disk.
//!
//! A completed job's artifacts are written under the output root in a
//! per-cluster tree, one subdirectory per structural format:
//!
//! ```text
//! <root>/cluster_<label>_model/PDB/cluster_<label>_model_001.pdb
//! <root>/cluster_<label>_model/CIF/cluster_<label>_model_001.cif
//! ```
//!
//! Directory creation is "ensure exists" and writes overwrite, so
//! re-materializing the same job is idempotent and concurrent workers
//! sharing a cluster directory never fail on creation races.

mod error;
mod fs_materializer;
mod traits;
mod types;

pub use error::MaterializeError;
pub use fs_materializer::FsMaterializer;
pub use traits::Materializer;
pub use types::{MaterializeJob, MaterializeResult};
