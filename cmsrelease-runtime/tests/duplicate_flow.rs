use std::sync::Arc;
use std::time::Duration;

use cmsrelease_core::{Addressing, OperationKind, SyncConfig};
use cmsrelease_gateway::{BackendGateway, MemoryGateway};
use cmsrelease_runtime::{block_on_with_shutdown, duplicate, KeyStep, ProbeState};
use cmsrelease_sync::open_space;

fn duplicate_config(to: &str) -> SyncConfig {
    let mut config = SyncConfig::builder(OperationKind::Duplicate)
        .management_token(Some("token".to_string()))
        .space_id(Some("space-1".to_string()))
        .addressing(Addressing {
            from: Some("master".to_string()),
            to: Some(to.to_string()),
            environment_id: None,
        })
        .build()
        .expect("build");
    config.poll.initial_delay = Duration::from_millis(1);
    config.poll.max_delay = Duration::from_millis(1);
    config
}

#[test]
fn blocking_entrypoint_drives_clone_to_ready() {
    let gateway: Arc<dyn BackendGateway> = Arc::new(
        MemoryGateway::new("space-1")
            .with_environment("master")
            .script_probes([false, true]),
    );
    let space = open_space(gateway.as_ref(), "space-1").expect("space");
    let config = duplicate_config("release-7");

    let report = block_on_with_shutdown(|shutdown| {
        let gateway = Arc::clone(&gateway);
        let space = space.clone();
        let config = config.clone();
        async move { duplicate(gateway, &space, &config, shutdown).await }
    })
    .expect("duplicate");

    assert_eq!(report.availability, ProbeState::Ready { attempts: 2 });
    assert_eq!(report.api_key, KeyStep::Skipped);
    assert!(gateway
        .get_environment(&space, &"release-7".into())
        .expect("lookup")
        .is_some());
}

#[test]
fn report_serialises_for_json_output() {
    let gateway = Arc::new(MemoryGateway::new("space-1").with_environment("master"));
    let space = open_space(gateway.as_ref(), "space-1").expect("space");
    let config = duplicate_config("release-8");

    let report = block_on_with_shutdown(|shutdown| async move {
        duplicate(gateway, &space, &config, shutdown).await
    })
    .expect("duplicate");

    let json = serde_json::to_value(&report).expect("encode");
    assert_eq!(json["environment"], "release-8");
    assert_eq!(json["availability"]["state"], "ready");
    assert_eq!(json["availability"]["attempts"], 1);
    assert_eq!(json["api_key"]["status"], "skipped");
}
