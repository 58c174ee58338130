//! Pure environment guard rules.
//!
//! The existence rule needs the backend and lives in `cmsrelease-sync`
//! (`guard::validate`); the addressing rule runs earlier, inside
//! [`crate::SyncConfigBuilder::build`]. What remains here needs nothing but
//! the configuration.

use crate::config::SyncConfig;
use crate::error::GuardViolation;
use crate::types::{EnvironmentRef, OperationKind};

/// Environments that must already exist before `config.operation` may run.
///
/// A clone destination is created by the operation itself, so only its
/// source is required.
pub fn required_environments(config: &SyncConfig) -> Vec<&EnvironmentRef> {
    match config.operation {
        OperationKind::Duplicate => config.source().into_iter().collect(),
        OperationKind::SyncEntries | OperationKind::SyncSchedule => config
            .source()
            .into_iter()
            .chain(std::iter::once(config.destination()))
            .collect(),
        OperationKind::Link | OperationKind::Delete => vec![config.destination()],
    }
}

/// Empty-name and protected-set rule.
pub fn check_protection(config: &SyncConfig) -> Result<(), GuardViolation> {
    let destination = config.destination();
    if destination.is_empty() {
        return Err(GuardViolation::EmptyDestination);
    }
    if config.operation.guards_protected()
        && config.protected.contains(destination)
        && !config.options.force_yes
    {
        return Err(GuardViolation::ProtectedEnvironment {
            environment: destination.clone(),
            operation: config.operation,
        });
    }
    Ok(())
}

/// Release naming rule; a no-op when the policy is switched off.
pub fn check_naming(config: &SyncConfig) -> Result<(), GuardViolation> {
    let Some(policy) = config.naming_policy.as_ref() else {
        return Ok(());
    };
    if !config.operation.checks_naming_policy() {
        return Ok(());
    }
    let destination = config.destination();
    if policy.matches(destination) {
        Ok(())
    } else {
        Err(GuardViolation::NamingPolicyViolation {
            environment: destination.clone(),
            pattern: policy.pattern().to_string(),
        })
    }
}

/// Protection then naming, in that order.
pub fn check_rules(config: &SyncConfig) -> Result<(), GuardViolation> {
    check_protection(config)?;
    check_naming(config)
}
