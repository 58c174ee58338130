//! cms-release core library: domain types, configuration, guard rules, errors.
//!
//! - [`types`]: environment references, scheduled actions, entries
//! - [`policy`]: protected set, release naming policy, availability polling policy
//! - [`config`]: addressing resolution, settings file, [`SyncConfig`] builder
//! - [`guard`]: the pure half of the environment guard
//! - [`error`]: [`ConfigurationError`], [`GuardViolation`]

pub mod config;
pub mod error;
pub mod guard;
pub mod policy;
pub mod types;

pub use config::{Addressing, Settings, SyncConfig, SyncConfigBuilder, SyncOptions, Target};
pub use error::{ConfigurationError, GuardViolation};
pub use policy::{PollPolicy, ProtectedEnvironmentSet, ReleaseNamingPolicy};
pub use types::{
    AliasRef, DedupKey, Entry, EnvironmentRef, OperationKind, ScheduledAction,
    ScheduledActionKind,
};
