//! Scheduled-action reconciliation.
//!
//! Pending actions are fetched from both environments before anything is
//! written; either fetch failing aborts the run. Each source action whose
//! dedup key is missing from the destination is recreated there, linked to
//! the destination environment.

use cmsrelease_core::{EnvironmentRef, ScheduledAction};
use cmsrelease_gateway::{BackendGateway, ScheduledActionQuery, Space};

use crate::error::{fetch_failed, SyncError};
use crate::plan::{replay, KeyIndex};
use crate::report::ReconciliationReport;

const WHAT: &str = "scheduled actions";

pub fn reconcile_scheduled_actions<G>(
    gateway: &G,
    space: &Space,
    source: &EnvironmentRef,
    destination: &EnvironmentRef,
    limit: u32,
    dry_run: bool,
) -> Result<ReconciliationReport, SyncError>
where
    G: BackendGateway + ?Sized,
{
    tracing::info!(
        "syncing scheduled actions from '{}' to '{}' (limit {})",
        source,
        destination,
        limit
    );

    let pending = fetch(gateway, space, source, limit)?;
    let existing = fetch(gateway, space, destination, limit)?;
    tracing::debug!(
        source = pending.len(),
        destination = existing.len(),
        "fetched scheduled actions"
    );

    let mut index = KeyIndex::from_items(&existing, ScheduledAction::dedup_key);
    let mut report = ReconciliationReport::new("scheduled-actions", source, destination, dry_run);
    replay(
        &mut report,
        &pending,
        &mut index,
        ScheduledAction::dedup_key,
        |action| {
            gateway
                .create_scheduled_action(space, &action.retarget(destination))
                .map(|_| ())
        },
    );

    tracing::info!(
        "scheduled actions: {} fetched, {} skipped, {} created, {} failed",
        report.fetched,
        report.skipped,
        report.created,
        report.failed
    );
    Ok(report)
}

fn fetch<G>(
    gateway: &G,
    space: &Space,
    environment: &EnvironmentRef,
    limit: u32,
) -> Result<Vec<ScheduledAction>, SyncError>
where
    G: BackendGateway + ?Sized,
{
    let query = ScheduledActionQuery {
        environment: environment.clone(),
        limit,
    };
    gateway.list_scheduled_actions(space, &query).map_err(|e| {
        tracing::error!("could not fetch {} of '{}': {}", WHAT, environment, e);
        fetch_failed(WHAT, environment, e)
    })
}
