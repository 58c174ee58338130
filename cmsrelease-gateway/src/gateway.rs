//! The backend seam and the handles it hands out.

use std::fmt;

use cmsrelease_core::{AliasRef, Entry, EnvironmentRef, ScheduledAction};

use crate::error::GatewayError;

/// A space (tenant) on the content platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub id: String,
    pub name: String,
}

/// Provisioning state as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentStatus {
    Ready,
    Queued,
    Failed,
    Other(String),
}

impl EnvironmentStatus {
    pub fn from_backend(id: &str) -> Self {
        match id {
            "ready" => EnvironmentStatus::Ready,
            "queued" => EnvironmentStatus::Queued,
            "failed" => EnvironmentStatus::Failed,
            other => EnvironmentStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentStatus::Ready => write!(f, "ready"),
            EnvironmentStatus::Queued => write!(f, "queued"),
            EnvironmentStatus::Failed => write!(f, "failed"),
            EnvironmentStatus::Other(other) => write!(f, "{other}"),
        }
    }
}

/// An environment, or an alias entry in an environment listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub space_id: String,
    pub id: EnvironmentRef,
    pub version: u64,
    pub status: EnvironmentStatus,
    /// Set when this listing entry is an alias pointing at another environment.
    pub aliased_environment: Option<EnvironmentRef>,
}

impl Environment {
    pub fn is_alias(&self) -> bool {
        self.aliased_environment.is_some()
    }
}

/// An environment whose clone was requested but may still be provisioning.
///
/// Only the availability loop is meant to probe it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedEnvironment(pub(crate) Environment);

impl ClonedEnvironment {
    pub fn new(environment: Environment) -> Self {
        Self(environment)
    }

    pub fn environment(&self) -> &Environment {
        &self.0
    }

    pub fn id(&self) -> &EnvironmentRef {
        &self.0.id
    }
}

/// A re-pointable alias and the environment it currently targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub space_id: String,
    pub id: AliasRef,
    pub version: u64,
    pub environment: EnvironmentRef,
}

/// Filter for [`BackendGateway::list_scheduled_actions`]; only pending
/// (`scheduled`) actions are ever requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledActionQuery {
    pub environment: EnvironmentRef,
    pub limit: u32,
}

/// Everything the release engine needs from the content platform.
///
/// Implementations are blocking; async callers go through
/// `tokio::task::spawn_blocking`.
pub trait BackendGateway: Send + Sync {
    /// `Ok(None)` when the space does not exist or is not visible to the token.
    fn get_space(&self, space_id: &str) -> Result<Option<Space>, GatewayError>;

    /// `Ok(None)` when the environment does not exist.
    fn get_environment(
        &self,
        space: &Space,
        environment: &EnvironmentRef,
    ) -> Result<Option<Environment>, GatewayError>;

    /// Environments and aliases of the space.
    fn list_environments(&self, space: &Space) -> Result<Vec<Environment>, GatewayError>;

    /// Request a clone of `source` named `destination`. Returns before the
    /// clone is queryable.
    fn duplicate_environment(
        &self,
        space: &Space,
        source: &EnvironmentRef,
        destination: &EnvironmentRef,
    ) -> Result<ClonedEnvironment, GatewayError>;

    /// Minimal read against a fresh clone; `Err` while still provisioning.
    fn probe_environment(&self, environment: &ClonedEnvironment) -> Result<(), GatewayError>;

    /// Give the delivery key named after `source` access to `destination`.
    ///
    /// `Ok(false)` when no such key exists.
    fn enable_access_key(
        &self,
        space: &Space,
        source: &EnvironmentRef,
        destination: &EnvironmentRef,
    ) -> Result<bool, GatewayError>;

    fn delete_environment(&self, environment: &Environment) -> Result<(), GatewayError>;

    fn get_alias(&self, space: &Space, alias: &AliasRef) -> Result<Option<Alias>, GatewayError>;

    /// Re-point `alias` at `environment`, returning the updated alias.
    fn point_alias(&self, alias: &Alias, environment: &EnvironmentRef)
        -> Result<Alias, GatewayError>;

    /// Pending scheduled actions, in backend order.
    fn list_scheduled_actions(
        &self,
        space: &Space,
        query: &ScheduledActionQuery,
    ) -> Result<Vec<ScheduledAction>, GatewayError>;

    /// Register `action` (its `environment` is the link target). Returns the
    /// created action with its backend id.
    fn create_scheduled_action(
        &self,
        space: &Space,
        action: &ScheduledAction,
    ) -> Result<ScheduledAction, GatewayError>;

    fn list_entries(
        &self,
        environment: &Environment,
        limit: u32,
    ) -> Result<Vec<Entry>, GatewayError>;

    fn create_entry(&self, environment: &Environment, entry: &Entry) -> Result<Entry, GatewayError>;
}
