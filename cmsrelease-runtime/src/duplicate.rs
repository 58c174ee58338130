//! Duplication orchestrator: guard, clone request, API key step, then
//! availability polling.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use cmsrelease_core::{EnvironmentRef, SyncConfig};
use cmsrelease_gateway::{BackendGateway, Space};
use cmsrelease_sync::validate;

use crate::availability::{await_availability, ProbeState};
use crate::error::PromoteError;
use crate::runtime::blocking;

/// Outcome of re-pointing the delivery key named after the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "kebab-case")]
pub enum KeyStep {
    /// `--update-api-key` was not given.
    Skipped,
    Updated,
    /// No key is named after the source environment.
    KeyNotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicationReport {
    pub source: EnvironmentRef,
    pub environment: EnvironmentRef,
    pub api_key: KeyStep,
    pub availability: ProbeState,
}

impl DuplicationReport {
    /// `Err(NotAvailable)` unless polling ended in `Ready`.
    pub fn ensure_available(&self) -> Result<(), PromoteError> {
        if self.availability.is_ready() {
            Ok(())
        } else {
            Err(PromoteError::NotAvailable {
                environment: self.environment.clone(),
                state: self.availability,
            })
        }
    }
}

/// Clone `config`'s source into its destination and wait until the clone
/// answers queries.
///
/// A failed clone request stops here with `DuplicationFailed`; the key step
/// never fails the operation.
pub async fn duplicate<G>(
    gateway: Arc<G>,
    space: &Space,
    config: &SyncConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<DuplicationReport, PromoteError>
where
    G: BackendGateway + ?Sized + 'static,
{
    let source = config
        .source()
        .unwrap_or(&config.main_environment)
        .clone();
    let destination = config.destination().clone();

    {
        let space = space.clone();
        let config = config.clone();
        blocking(&gateway, "guard", move |gateway| {
            validate(gateway, &space, &config)
        })
        .await??;
    }

    tracing::info!("duplicating '{}' into '{}'", source, destination);
    let cloned = {
        let space = space.clone();
        let (source, destination) = (source.clone(), destination.clone());
        blocking(&gateway, "duplicate", move |gateway| {
            gateway.duplicate_environment(&space, &source, &destination)
        })
        .await?
    };
    let cloned = match cloned {
        Ok(cloned) => cloned,
        Err(cause) => {
            tracing::error!("could not duplicate '{}': {}", source, cause);
            return Err(PromoteError::DuplicationFailed {
                from: source,
                to: destination,
                cause,
            });
        }
    };
    tracing::info!(
        environment = %cloned.id(),
        status = %cloned.environment().status,
        "clone requested"
    );

    let api_key = if config.options.update_api_key {
        update_api_key(&gateway, space, &source, &destination).await?
    } else {
        KeyStep::Skipped
    };

    let availability = await_availability(Arc::clone(&gateway), &cloned, &config.poll, shutdown).await?;

    Ok(DuplicationReport {
        source,
        environment: destination,
        api_key,
        availability,
    })
}

async fn update_api_key<G>(
    gateway: &Arc<G>,
    space: &Space,
    source: &EnvironmentRef,
    destination: &EnvironmentRef,
) -> Result<KeyStep, PromoteError>
where
    G: BackendGateway + ?Sized + 'static,
{
    let space = space.clone();
    let (from, to) = (source.clone(), destination.clone());
    let result = blocking(gateway, "api key", move |gateway| {
        gateway.enable_access_key(&space, &from, &to)
    })
    .await?;

    Ok(match result {
        Ok(true) => {
            tracing::info!("api key '{}' now also serves '{}'", source, destination);
            KeyStep::Updated
        }
        Ok(false) => {
            tracing::warn!("no api key named '{}'; nothing updated", source);
            KeyStep::KeyNotFound
        }
        Err(err) => {
            tracing::warn!("could not update api key '{}': {}", source, err);
            KeyStep::Failed(err.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cmsrelease_core::{Addressing, GuardViolation, OperationKind};
    use cmsrelease_gateway::MemoryGateway;
    use cmsrelease_sync::{open_space, SyncError};

    use super::*;

    fn config(to: &str, update_api_key: bool) -> SyncConfig {
        let mut config = SyncConfig::builder(OperationKind::Duplicate)
            .management_token(Some("token".to_string()))
            .space_id(Some("space-1".to_string()))
            .addressing(Addressing {
                from: None,
                to: Some(to.to_string()),
                environment_id: None,
            })
            .update_api_key(update_api_key)
            .build()
            .expect("build");
        config.poll.initial_delay = Duration::from_millis(1);
        config.poll.max_delay = Duration::from_millis(2);
        config
    }

    async fn run(gateway: Arc<MemoryGateway>, config: &SyncConfig) -> Result<DuplicationReport, PromoteError> {
        let space = open_space(gateway.as_ref(), "space-1").expect("space");
        let (_tx, rx) = broadcast::channel(1);
        duplicate(gateway, &space, config, rx).await
    }

    #[tokio::test]
    async fn clone_then_ready_after_three_probes() {
        let gateway = Arc::new(
            MemoryGateway::new("space-1")
                .with_environment("master")
                .with_api_key("master", &["master"])
                .script_probes([false, false, true]),
        );

        let report = run(Arc::clone(&gateway), &config("release-2", true))
            .await
            .expect("duplicate");

        assert_eq!(report.source.as_str(), "master");
        assert_eq!(report.availability, ProbeState::Ready { attempts: 3 });
        assert_eq!(report.api_key, KeyStep::Updated);
        assert!(report.ensure_available().is_ok());
        assert_eq!(gateway.probe_count(), 3);
        assert!(gateway
            .api_key_environments("master")
            .contains(&EnvironmentRef::from("release-2")));
    }

    #[tokio::test]
    async fn failed_clone_request_never_polls() {
        let gateway = Arc::new(
            MemoryGateway::new("space-1")
                .with_environment("master")
                .fail_duplicate(),
        );

        let err = run(Arc::clone(&gateway), &config("release-2", true))
            .await
            .expect_err("clone fails");

        assert!(matches!(err, PromoteError::DuplicationFailed { .. }));
        assert_eq!(gateway.probe_count(), 0);
        assert!(gateway
            .calls()
            .iter()
            .all(|call| !call.starts_with("enable_access_key")));
    }

    #[tokio::test]
    async fn missing_api_key_is_not_fatal() {
        let gateway = Arc::new(MemoryGateway::new("space-1").with_environment("master"));

        let report = run(gateway, &config("release-2", true))
            .await
            .expect("duplicate");

        assert_eq!(report.api_key, KeyStep::KeyNotFound);
        assert!(report.availability.is_ready());
    }

    #[tokio::test]
    async fn guard_violation_stops_before_cloning() {
        let gateway = Arc::new(MemoryGateway::new("space-1").with_environment("master"));

        let err = run(Arc::clone(&gateway), &config("not-a-release", false))
            .await
            .expect_err("naming policy");

        assert!(matches!(
            err,
            PromoteError::Sync(SyncError::Guard(GuardViolation::NamingPolicyViolation { .. }))
        ));
        assert!(gateway
            .calls()
            .iter()
            .all(|call| !call.starts_with("duplicate_environment")));
    }

    #[tokio::test]
    async fn exhausted_polling_is_reported_not_available() {
        let gateway = Arc::new(
            MemoryGateway::new("space-1")
                .with_environment("master")
                .script_probes([false; 5]),
        );
        let mut config = config("release-2", false);
        config.poll.max_attempts = 2;

        let report = run(gateway, &config).await.expect("duplicate");

        assert_eq!(report.availability, ProbeState::TimedOut { attempts: 2 });
        assert!(matches!(
            report.ensure_available(),
            Err(PromoteError::NotAvailable { .. })
        ));
    }
}
