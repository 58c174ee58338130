//! Run the one operation an invocation asks for.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use cmsrelease_core::{OperationKind, SyncConfig};
use cmsrelease_gateway::{contentful::DEFAULT_BASE_URL, BackendGateway, ContentfulClient, Space};
use cmsrelease_runtime::{block_on_with_shutdown, delete, duplicate, link};
use cmsrelease_sync::{open_space, pipeline};

use crate::args::Cli;
use crate::{config, output};

/// Any `Err` maps to exit code 1. Per-item reconciliation failures do not.
pub fn run(cli: &Cli, cwd: &Path) -> Result<()> {
    let config = config::build(cli, cwd)?;
    let gateway: Arc<dyn BackendGateway> = Arc::new(ContentfulClient::with_base_url(
        config.management_token.clone(),
        cli.api_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
    ));
    execute(gateway, &config, cli.json)
}

pub fn execute(gateway: Arc<dyn BackendGateway>, config: &SyncConfig, json: bool) -> Result<()> {
    let space = open_space(gateway.as_ref(), &config.space_id)
        .context("cannot reach the space; check the management token and space id")?;
    tracing::info!("space '{}' ({})", space.name, space.id);

    match config.operation {
        OperationKind::Duplicate => run_duplicate(gateway, space, config, json),
        OperationKind::SyncEntries | OperationKind::SyncSchedule => {
            let report = pipeline::run(gateway.as_ref(), &space, config)
                .with_context(|| format!("{} failed", config.operation.flag()))?;
            if json {
                output::print_json(&report)
            } else {
                output::print_reconciliation(&report);
                Ok(())
            }
        }
        OperationKind::Link => {
            let report = link(gateway.as_ref(), &space, config).context("--link failed")?;
            if json {
                output::print_json(&report)
            } else {
                output::print_link(&report);
                Ok(())
            }
        }
        OperationKind::Delete => {
            let report = delete(gateway.as_ref(), &space, config).context("--delete failed")?;
            if json {
                output::print_json(&report)
            } else {
                output::print_delete(&report);
                Ok(())
            }
        }
    }
}

fn run_duplicate(
    gateway: Arc<dyn BackendGateway>,
    space: Space,
    config: &SyncConfig,
    json: bool,
) -> Result<()> {
    let task_config = config.clone();
    let report = block_on_with_shutdown(move |shutdown| async move {
        duplicate(gateway, &space, &task_config, shutdown).await
    })
    .context("--duplicate failed")?;

    if json {
        output::print_json(&report)?;
    } else {
        output::print_duplication(&report);
    }
    report.ensure_available()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cmsrelease_core::{Addressing, ScheduledAction, ScheduledActionKind};
    use cmsrelease_gateway::MemoryGateway;

    use super::*;

    fn config(operation: OperationKind, addressing: Addressing) -> SyncConfig {
        let mut config = SyncConfig::builder(operation)
            .management_token(Some("token".to_string()))
            .space_id(Some("space-1".to_string()))
            .addressing(addressing)
            .poll_max_attempts(Some(2))
            .build()
            .expect("build");
        config.poll.initial_delay = Duration::from_millis(1);
        config
    }

    fn env_id(id: &str) -> Addressing {
        Addressing {
            environment_id: Some(id.to_string()),
            ..Addressing::default()
        }
    }

    #[test]
    fn unknown_space_fails() {
        let gateway: Arc<dyn BackendGateway> = Arc::new(MemoryGateway::new("other"));
        let err = execute(gateway, &config(OperationKind::Delete, env_id("release-1")), false)
            .expect_err("space");
        assert!(format!("{err:#}").contains("space-1"));
    }

    #[test]
    fn sync_with_failed_item_still_succeeds() {
        let memory = Arc::new(
            MemoryGateway::new("space-1")
                .with_environment("release-1")
                .with_environment("release-2")
                .with_scheduled_action(ScheduledAction {
                    id: None,
                    entity_id: "A".to_string(),
                    entity_link_type: "Entry".to_string(),
                    action: ScheduledActionKind::Publish,
                    scheduled_for: "2024-01-01T10:00".to_string(),
                    timezone: Some("UTC".to_string()),
                    environment: "release-1".into(),
                })
                .fail_create_for_entity("A"),
        );
        let addressing = Addressing {
            from: Some("release-1".to_string()),
            to: Some("release-2".to_string()),
            environment_id: None,
        };
        execute(memory.clone(), &config(OperationKind::SyncSchedule, addressing), true)
            .expect("per-item failures are not fatal");
        assert!(memory.scheduled_actions_in("release-2").is_empty());
    }

    #[test]
    fn clone_that_never_becomes_available_fails() {
        let memory = Arc::new(
            MemoryGateway::new("space-1")
                .with_environment("master")
                .script_probes([false, false]),
        );
        let addressing = Addressing {
            to: Some("release-5".to_string()),
            ..Addressing::default()
        };
        let err = execute(memory, &config(OperationKind::Duplicate, addressing), false)
            .expect_err("not available");
        assert!(err.to_string().contains("release-5"));
    }

    #[test]
    fn delete_removes_environment() {
        let memory = Arc::new(MemoryGateway::new("space-1").with_environment("release-1"));
        execute(memory.clone(), &config(OperationKind::Delete, env_id("release-1")), false)
            .expect("delete");
        assert!(memory.environment_ids().is_empty());
    }
}
