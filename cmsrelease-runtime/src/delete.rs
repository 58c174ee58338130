//! Environment deletion.

use serde::Serialize;

use cmsrelease_core::{EnvironmentRef, SyncConfig};
use cmsrelease_gateway::{BackendGateway, Space};
use cmsrelease_sync::{validate, SyncError};

use crate::error::PromoteError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub environment: EnvironmentRef,
}

/// Delete the destination environment. Protected environments need
/// `--force-yes`.
pub fn delete<G>(gateway: &G, space: &Space, config: &SyncConfig) -> Result<DeleteReport, PromoteError>
where
    G: BackendGateway + ?Sized,
{
    let checked = validate(gateway, space, config)?;
    let environment = checked
        .destination
        .ok_or(SyncError::UnsupportedOperation(config.operation))?;

    gateway.delete_environment(&environment)?;
    tracing::info!("deleted environment '{}'", environment.id);
    Ok(DeleteReport {
        environment: environment.id,
    })
}
