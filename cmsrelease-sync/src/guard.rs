//! The full environment guard: existence lookups, then the pure rules.

use cmsrelease_core::guard::{check_rules, required_environments};
use cmsrelease_core::{EnvironmentRef, GuardViolation, OperationKind, SyncConfig};
use cmsrelease_gateway::{BackendGateway, Environment, Space};

use crate::error::SyncError;

/// Environment handles resolved while validating.
///
/// A clone destination does not exist yet, so `destination` is `None` for
/// duplicate; `source` is `None` for link and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedEnvironments {
    pub source: Option<Environment>,
    pub destination: Option<Environment>,
}

/// Look up the space every operation runs in.
pub fn open_space<G>(gateway: &G, space_id: &str) -> Result<Space, SyncError>
where
    G: BackendGateway + ?Sized,
{
    match gateway.get_space(space_id)? {
        Some(space) => {
            tracing::debug!(space = %space.id, "space found: {}", space.name);
            Ok(space)
        }
        None => Err(SyncError::SpaceNotFound {
            space_id: space_id.to_string(),
        }),
    }
}

/// Run every guard rule for `config.operation`, in order:
///
/// 1. each required environment exists (`UnknownEnvironment`);
/// 2. empty-name and protected-set rule;
/// 3. release naming rule, when the policy is on.
///
/// Addressing was already settled when the config was built.
pub fn validate<G>(
    gateway: &G,
    space: &Space,
    config: &SyncConfig,
) -> Result<CheckedEnvironments, SyncError>
where
    G: BackendGateway + ?Sized,
{
    let mut found = Vec::new();
    for environment in required_environments(config) {
        found.push(lookup(gateway, space, environment)?);
    }
    let mut found = found.into_iter();

    check_rules(config)?;

    let checked = match config.operation {
        OperationKind::Duplicate => CheckedEnvironments {
            source: found.next(),
            destination: None,
        },
        OperationKind::SyncEntries | OperationKind::SyncSchedule => CheckedEnvironments {
            source: found.next(),
            destination: found.next(),
        },
        OperationKind::Link | OperationKind::Delete => CheckedEnvironments {
            source: None,
            destination: found.next(),
        },
    };
    tracing::debug!(operation = %config.operation, "guard passed");
    Ok(checked)
}

fn lookup<G>(gateway: &G, space: &Space, environment: &EnvironmentRef) -> Result<Environment, SyncError>
where
    G: BackendGateway + ?Sized,
{
    gateway
        .get_environment(space, environment)?
        .ok_or_else(|| {
            SyncError::Guard(GuardViolation::UnknownEnvironment {
                environment: environment.clone(),
            })
        })
}
