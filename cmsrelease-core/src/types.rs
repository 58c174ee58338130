//! Domain types shared by every cms-release crate.
//!
//! Names are compared by exact string equality everywhere; nothing here
//! normalises case or whitespace.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The id of an environment inside a space (e.g. `master`, `release-1.4.0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentRef(pub String);

impl EnvironmentRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EnvironmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EnvironmentRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EnvironmentRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// The id of an environment alias (a re-pointable name such as `master`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasRef(pub String);

impl fmt::Display for AliasRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AliasRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AliasRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// The single logical operation one invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    Duplicate,
    SyncEntries,
    SyncSchedule,
    Link,
    Delete,
}

impl OperationKind {
    /// Operations that write into an existing destination environment.
    pub fn is_sync_style(self) -> bool {
        matches!(self, OperationKind::SyncEntries | OperationKind::SyncSchedule)
    }

    /// Operations that read one environment and write another.
    pub fn is_pair(self) -> bool {
        matches!(self, OperationKind::Duplicate) || self.is_sync_style()
    }

    /// Operations refused on a protected destination unless forced.
    pub fn guards_protected(self) -> bool {
        matches!(
            self,
            OperationKind::Duplicate
                | OperationKind::SyncEntries
                | OperationKind::SyncSchedule
                | OperationKind::Delete
        )
    }

    /// Operations whose destination name is checked against the release policy.
    pub fn checks_naming_policy(self) -> bool {
        matches!(self, OperationKind::Duplicate | OperationKind::Link)
    }

    pub fn flag(self) -> &'static str {
        match self {
            OperationKind::Duplicate => "--duplicate",
            OperationKind::SyncEntries => "--sync-entries",
            OperationKind::SyncSchedule => "--sync-schedule",
            OperationKind::Link => "--link",
            OperationKind::Delete => "--delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Duplicate => write!(f, "duplicate"),
            OperationKind::SyncEntries => write!(f, "sync-entries"),
            OperationKind::SyncSchedule => write!(f, "sync-schedule"),
            OperationKind::Link => write!(f, "link"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduled actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduledActionKind {
    Publish,
    Unpublish,
}

impl fmt::Display for ScheduledActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduledActionKind::Publish => write!(f, "publish"),
            ScheduledActionKind::Unpublish => write!(f, "unpublish"),
        }
    }
}

/// A pending publish/unpublish registered on the backend for one entity.
///
/// `scheduled_for` and `timezone` are kept verbatim as the backend returned
/// them; two instants written differently are different actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    /// Backend id; `None` for actions not yet created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub entity_id: String,
    pub entity_link_type: String,
    pub action: ScheduledActionKind,
    pub scheduled_for: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub environment: EnvironmentRef,
}

impl ScheduledAction {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            entity_id: self.entity_id.clone(),
            entity_link_type: self.entity_link_type.clone(),
            action: self.action,
            scheduled_for: self.scheduled_for.clone(),
            timezone: self.timezone.clone(),
        }
    }

    /// Copy of this action linked to `environment`, without a backend id.
    pub fn retarget(&self, environment: &EnvironmentRef) -> ScheduledAction {
        ScheduledAction {
            id: None,
            environment: environment.clone(),
            ..self.clone()
        }
    }
}

/// Equivalence key for scheduled actions across environments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DedupKey {
    pub entity_id: String,
    pub entity_link_type: String,
    pub action: ScheduledActionKind,
    pub scheduled_for: String,
    pub timezone: Option<String>,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}:{} at {} ({})",
            self.action,
            self.entity_link_type,
            self.entity_id,
            self.scheduled_for,
            self.timezone.as_deref().unwrap_or("no timezone"),
        )
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A content entry, reduced to what entry synchronisation copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub content_type: String,
    #[serde(default)]
    pub fields: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
