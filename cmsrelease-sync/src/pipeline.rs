//! Shared synchronisation entrypoint used by the CLI.

use cmsrelease_core::{OperationKind, SyncConfig};
use cmsrelease_gateway::{BackendGateway, Space};

use crate::entries::reconcile_entries;
use crate::error::SyncError;
use crate::guard::validate;
use crate::report::ReconciliationReport;
use crate::schedule::reconcile_scheduled_actions;

/// Guard `config`, then reconcile the environments it names.
///
/// Only `SyncSchedule` and `SyncEntries` are accepted.
pub fn run<G>(
    gateway: &G,
    space: &Space,
    config: &SyncConfig,
) -> Result<ReconciliationReport, SyncError>
where
    G: BackendGateway + ?Sized,
{
    if !config.operation.is_sync_style() {
        return Err(SyncError::UnsupportedOperation(config.operation));
    }
    let checked = validate(gateway, space, config)?;
    let (Some(source), Some(destination)) = (checked.source, checked.destination) else {
        return Err(SyncError::UnsupportedOperation(config.operation));
    };
    let options = &config.options;

    match config.operation {
        // Scheduled actions are filtered by the names given, so an alias
        // such as `master` is resolved by the backend.
        OperationKind::SyncSchedule => reconcile_scheduled_actions(
            gateway,
            space,
            config.source().unwrap_or(&source.id),
            config.destination(),
            options.max_scheduled_actions,
            options.dry_run,
        ),
        _ => reconcile_entries(
            gateway,
            &source,
            &destination,
            options.max_entries,
            options.dry_run,
        ),
    }
}
