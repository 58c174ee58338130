//! Entry reconciliation: copy entries missing (by id) from the destination.
//!
//! Existing destination entries are never touched, even if their fields
//! differ from the source.

use cmsrelease_core::Entry;
use cmsrelease_gateway::{BackendGateway, Environment};

use crate::error::{fetch_failed, SyncError};
use crate::plan::{replay, KeyIndex};
use crate::report::ReconciliationReport;

const WHAT: &str = "entries";

pub fn reconcile_entries<G>(
    gateway: &G,
    source: &Environment,
    destination: &Environment,
    limit: u32,
    dry_run: bool,
) -> Result<ReconciliationReport, SyncError>
where
    G: BackendGateway + ?Sized,
{
    tracing::info!(
        "syncing entries from '{}' to '{}' (limit {})",
        source.id,
        destination.id,
        limit
    );

    let wanted = fetch(gateway, source, limit)?;
    let present = fetch(gateway, destination, limit)?;

    let mut index = KeyIndex::from_items(&present, entry_id);
    let mut report = ReconciliationReport::new(WHAT, &source.id, &destination.id, dry_run);
    replay(&mut report, &wanted, &mut index, entry_id, |entry| {
        gateway.create_entry(destination, entry).map(|_| ())
    });

    tracing::info!(
        "entries: {} fetched, {} skipped, {} created, {} failed",
        report.fetched,
        report.skipped,
        report.created,
        report.failed
    );
    Ok(report)
}

fn entry_id(entry: &Entry) -> String {
    entry.id.clone()
}

fn fetch<G>(gateway: &G, environment: &Environment, limit: u32) -> Result<Vec<Entry>, SyncError>
where
    G: BackendGateway + ?Sized,
{
    gateway.list_entries(environment, limit).map_err(|e| {
        tracing::error!("could not fetch {} of '{}': {}", WHAT, environment.id, e);
        fetch_failed(WHAT, &environment.id, e)
    })
}

#[cfg(test)]
mod tests {
    use cmsrelease_core::EnvironmentRef;
    use cmsrelease_gateway::{MemoryGateway, Space};
    use serde_json::json;

    use super::*;

    fn entry(id: &str, title: &str) -> Entry {
        Entry {
            id: id.to_string(),
            content_type: "page".to_string(),
            fields: json!({ "title": { "en-US": title } }),
        }
    }

    fn environments(gateway: &MemoryGateway) -> (Environment, Environment) {
        let space: Space = gateway.get_space("space-1").expect("lookup").expect("space");
        let get = |id: &str| {
            gateway
                .get_environment(&space, &EnvironmentRef::from(id))
                .expect("lookup")
                .expect("exists")
        };
        (get("release-1"), get("master"))
    }

    #[test]
    fn copies_missing_entries_without_overwriting() {
        let gateway = MemoryGateway::new("space-1")
            .with_environment("release-1")
            .with_environment("master")
            .with_entry("release-1", entry("e1", "new title"))
            .with_entry("release-1", entry("e2", "second"))
            .with_entry("master", entry("e1", "old title"));
        let (source, destination) = environments(&gateway);

        let report = reconcile_entries(&gateway, &source, &destination, 1000, false).expect("sync");
        assert_eq!((report.fetched, report.created, report.skipped), (2, 1, 1));

        let master = gateway.entries_in("master");
        assert_eq!(master.len(), 2);
        assert_eq!(master[0].fields["title"]["en-US"], "old title");
        assert_eq!(master[1].id, "e2");
    }

    #[test]
    fn failing_source_listing_is_fatal() {
        let gateway = MemoryGateway::new("space-1")
            .with_environment("release-1")
            .with_environment("master")
            .fail_listing("release-1");
        let (source, destination) = environments(&gateway);
        let err = reconcile_entries(&gateway, &source, &destination, 1000, false)
            .expect_err("fetch failure");
        assert!(matches!(err, SyncError::FetchFailed { what: "entries", .. }));
    }
}
