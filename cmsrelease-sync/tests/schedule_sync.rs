//! End-to-end scheduled-action sync against the in-memory backend.

use cmsrelease_core::{
    Addressing, EnvironmentRef, GuardViolation, OperationKind, ScheduledAction,
    ScheduledActionKind, SyncConfig,
};
use cmsrelease_gateway::MemoryGateway;
use cmsrelease_sync::{open_space, pipeline, ItemOutcome, SyncError};

fn action(entity: &str, environment: &str) -> ScheduledAction {
    ScheduledAction {
        id: None,
        entity_id: entity.to_string(),
        entity_link_type: "Entry".to_string(),
        action: ScheduledActionKind::Publish,
        scheduled_for: "2024-01-01T10:00".to_string(),
        timezone: Some("UTC".to_string()),
        environment: EnvironmentRef::from(environment),
    }
}

fn sync_config(from: &str, to: &str, dry_run: bool) -> SyncConfig {
    SyncConfig::builder(OperationKind::SyncSchedule)
        .management_token(Some("token".to_string()))
        .space_id(Some("space-1".to_string()))
        .addressing(Addressing {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            environment_id: None,
        })
        .max_scheduled_actions(Some(500))
        .dry_run(dry_run)
        .build()
        .expect("build")
}

#[test]
fn scenario_single_item_into_empty_destination() {
    let gateway = MemoryGateway::new("space-1")
        .with_environment("release-1")
        .with_environment("release-2")
        .with_scheduled_action(action("A", "release-1"));
    let space = open_space(&gateway, "space-1").expect("space");

    let report = pipeline::run(&gateway, &space, &sync_config("release-1", "release-2", false))
        .expect("sync");

    assert_eq!(
        (report.fetched, report.created, report.skipped, report.failed),
        (1, 1, 0, 0)
    );
    let created = gateway.scheduled_actions_in("release-2");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].entity_link_type, "Entry");
    assert_eq!(created[0].action, ScheduledActionKind::Publish);
}

#[test]
fn replay_is_idempotent() {
    let gateway = MemoryGateway::new("space-1")
        .with_environment("release-1")
        .with_environment("release-2")
        .with_scheduled_action(action("A", "release-1"))
        .with_scheduled_action(action("B", "release-1"))
        .with_scheduled_action(action("B", "release-2"));
    let space = open_space(&gateway, "space-1").expect("space");
    let config = sync_config("release-1", "release-2", false);

    let first = pipeline::run(&gateway, &space, &config).expect("first");
    assert_eq!((first.created, first.skipped), (1, 1));
    assert_eq!(first.items[1].outcome, ItemOutcome::SkippedDuplicate);

    let second = pipeline::run(&gateway, &space, &config).expect("second");
    assert_eq!(second.created, 0);
    assert!(second.is_noop());
}

#[test]
fn dry_run_reports_without_writing() {
    let gateway = MemoryGateway::new("space-1")
        .with_environment("release-1")
        .with_environment("release-2")
        .with_scheduled_action(action("A", "release-1"));
    let space = open_space(&gateway, "space-1").expect("space");

    let report = pipeline::run(&gateway, &space, &sync_config("release-1", "release-2", true))
        .expect("dry run");

    assert!(report.dry_run);
    assert_eq!(report.would_create, 1);
    assert!(gateway.scheduled_actions_in("release-2").is_empty());
}

#[test]
fn vanished_source_fails_the_guard_before_any_listing() {
    let gateway = MemoryGateway::new("space-1").with_environment("release-2");
    let space = open_space(&gateway, "space-1").expect("space");

    let err = pipeline::run(&gateway, &space, &sync_config("release-1", "release-2", false))
        .expect_err("unknown source");

    assert!(matches!(
        err,
        SyncError::Guard(GuardViolation::UnknownEnvironment { .. })
    ));
    assert!(gateway
        .calls()
        .iter()
        .all(|call| !call.starts_with("list_scheduled_actions")));
}
