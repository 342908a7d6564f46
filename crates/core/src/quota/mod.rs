//! Request budget enforcement for the remote modeling service.
//!
//! The service enforces two overlapping request ceilings (a rapid
//! per-minute window and a prolonged multi-hour window). Every outbound
//! call acquires admission from the [`QuotaGovernor`] first; callers are
//! suspended, never rejected, when a ceiling is reached.

mod governor;

pub use governor::{QuotaConfig, QuotaGovernor, QuotaStatus};
