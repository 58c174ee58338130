//! # cmsrelease-sync
//!
//! Guarded one-way synchronisation between two environments.
//!
//! Call [`pipeline::run`] with a sync-style [`cmsrelease_core::SyncConfig`] to
//! validate it against the backend and replay missing scheduled actions or
//! entries into the destination.

pub mod entries;
pub mod error;
pub mod guard;
pub mod pipeline;
pub mod plan;
pub mod report;
pub mod schedule;

pub use entries::reconcile_entries;
pub use error::SyncError;
pub use guard::{open_space, validate, CheckedEnvironments};
pub use report::{ItemOutcome, ItemReport, ReconciliationReport};
pub use schedule::reconcile_scheduled_actions;
