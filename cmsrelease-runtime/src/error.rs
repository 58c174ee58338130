use thiserror::Error;

use cmsrelease_core::{AliasRef, EnvironmentRef};
use cmsrelease_gateway::GatewayError;
use cmsrelease_sync::SyncError;

use crate::availability::ProbeState;

/// Error surface for duplicate, link and delete.
#[derive(Debug, Error)]
pub enum PromoteError {
    /// Guard violations and space lookup failures.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The clone request itself failed; nothing was polled.
    #[error("duplicating '{from}' into '{to}' failed: {cause}")]
    DuplicationFailed {
        from: EnvironmentRef,
        to: EnvironmentRef,
        #[source]
        cause: GatewayError,
    },

    #[error("environment '{environment}' is not available: {state}")]
    NotAvailable {
        environment: EnvironmentRef,
        state: ProbeState,
    },

    #[error("alias '{alias}' does not exist")]
    AliasNotFound { alias: AliasRef },

    #[error("backend error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("task join failure: {0}")]
    Join(String),

    #[error("could not start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
