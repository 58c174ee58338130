//! Error types for cmsrelease-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{EnvironmentRef, OperationKind};

/// Reasons the environment guard refuses an operation.
///
/// Every variant is fatal for the invocation and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardViolation {
    #[error("environment '{environment}' does not exist")]
    UnknownEnvironment { environment: EnvironmentRef },

    #[error("environment '{environment}' is protected and cannot be used for {operation} without --force-yes")]
    ProtectedEnvironment {
        environment: EnvironmentRef,
        operation: OperationKind,
    },

    #[error("the destination environment name is empty")]
    EmptyDestination,

    #[error("environment '{environment}' does not follow the release naming convention '{pattern}'")]
    NamingPolicyViolation {
        environment: EnvironmentRef,
        pattern: String,
    },

    #[error("{reason}")]
    AmbiguousTarget { reason: String },
}

impl GuardViolation {
    pub(crate) fn ambiguous(reason: impl Into<String>) -> Self {
        GuardViolation::AmbiguousTarget {
            reason: reason.into(),
        }
    }
}

/// Errors raised while assembling a [`crate::SyncConfig`].
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("only one of the two options '--management-token' or '--mt' can be specified")]
    ConflictingTokenFlags,

    #[error("only one action can be chosen per invocation, got: {0}")]
    ConflictingActions(String),

    #[error("no action chosen; pass one of --duplicate, --sync-entries, --sync-schedule, --link or --delete")]
    NoAction,

    #[error("missing management token; use --management-token, --mt or CMS_MANAGEMENT_TOKEN")]
    MissingManagementToken,

    #[error("missing space id; use --space-id or CMS_SPACE_ID")]
    MissingSpaceId,

    #[error("invalid release regex '{pattern}': {source}")]
    InvalidReleaseRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid poll policy: {0}")]
    InvalidPollPolicy(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Settings file parse error, with the file path and serde_yaml's line context.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Addressing(#[from] GuardViolation),
}
