//! Error types for cmsrelease-sync.

use thiserror::Error;

use cmsrelease_core::{EnvironmentRef, GuardViolation, OperationKind};
use cmsrelease_gateway::GatewayError;

/// Errors that stop a whole synchronisation run.
///
/// Per-item create failures are not errors; they end up in the report.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Guard(#[from] GuardViolation),

    #[error("space '{space_id}' not found; check the management token and the space id")]
    SpaceNotFound { space_id: String },

    /// Listing one side of the diff failed; nothing was applied.
    #[error("could not fetch {what} of environment '{environment}': {source}")]
    FetchFailed {
        what: &'static str,
        environment: EnvironmentRef,
        #[source]
        source: GatewayError,
    },

    #[error("{0} is not a synchronisation operation")]
    UnsupportedOperation(OperationKind),

    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Convenience constructor for [`SyncError::FetchFailed`].
pub(crate) fn fetch_failed(
    what: &'static str,
    environment: &EnvironmentRef,
    source: GatewayError,
) -> SyncError {
    SyncError::FetchFailed {
        what,
        environment: environment.clone(),
        source,
    }
}
