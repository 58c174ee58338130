//! Alias linking, optionally pruning superseded release environments.

use serde::Serialize;

use cmsrelease_core::{AliasRef, EnvironmentRef, SyncConfig};
use cmsrelease_gateway::{BackendGateway, Environment, Space};
use cmsrelease_sync::validate;

use crate::error::PromoteError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub environment: EnvironmentRef,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub alias: AliasRef,
    pub environment: EnvironmentRef,
    /// Target before this run.
    pub previous: EnvironmentRef,
    /// `false` when the alias already pointed at `environment`.
    pub changed: bool,
    pub pruned: Vec<EnvironmentRef>,
    pub prune_failures: Vec<PruneFailure>,
}

/// Point `config.alias` at the destination environment.
///
/// With `prune_old_releases`, every other environment that follows the
/// release naming policy, is not protected and is not targeted by any alias
/// is deleted afterwards. Prune failures are collected, never raised.
pub fn link<G>(gateway: &G, space: &Space, config: &SyncConfig) -> Result<LinkReport, PromoteError>
where
    G: BackendGateway + ?Sized,
{
    validate(gateway, space, config)?;
    let environment = config.destination();

    let alias = gateway
        .get_alias(space, &config.alias)?
        .ok_or_else(|| PromoteError::AliasNotFound {
            alias: config.alias.clone(),
        })?;
    let previous = alias.environment.clone();

    let changed = &previous != environment;
    if changed {
        let updated = gateway.point_alias(&alias, environment)?;
        tracing::info!(
            "alias '{}' now points at '{}' (was '{}')",
            updated.id,
            updated.environment,
            previous
        );
    } else {
        tracing::info!("alias '{}' already points at '{}'", alias.id, environment);
    }

    let mut report = LinkReport {
        alias: config.alias.clone(),
        environment: environment.clone(),
        previous,
        changed,
        pruned: Vec::new(),
        prune_failures: Vec::new(),
    };

    if config.options.prune_old_releases {
        prune(gateway, space, config, &mut report)?;
    }
    Ok(report)
}

fn prune<G>(
    gateway: &G,
    space: &Space,
    config: &SyncConfig,
    report: &mut LinkReport,
) -> Result<(), PromoteError>
where
    G: BackendGateway + ?Sized,
{
    let Some(policy) = config.naming_policy.as_ref() else {
        tracing::warn!("release naming policy is off; not pruning old releases");
        return Ok(());
    };

    let listing = gateway.list_environments(space)?;
    let aliased: Vec<&EnvironmentRef> = listing
        .iter()
        .filter_map(|e| e.aliased_environment.as_ref())
        .collect();
    let candidates: Vec<&Environment> = listing
        .iter()
        .filter(|e| !e.is_alias())
        .filter(|e| e.id != report.environment)
        .filter(|e| !config.protected.contains(&e.id))
        .filter(|e| !aliased.contains(&&e.id))
        .filter(|e| policy.matches(&e.id))
        .collect();

    for environment in candidates {
        match gateway.delete_environment(environment) {
            Ok(()) => {
                tracing::info!("pruned old release '{}'", environment.id);
                report.pruned.push(environment.id.clone());
            }
            Err(err) => {
                tracing::warn!("could not prune '{}': {}", environment.id, err);
                report.prune_failures.push(PruneFailure {
                    environment: environment.id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }
    Ok(())
}
