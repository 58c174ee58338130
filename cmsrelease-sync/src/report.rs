//! Reconciliation reports.

use serde::Serialize;

use cmsrelease_core::EnvironmentRef;

/// What happened to one source item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemOutcome {
    Created,
    /// `--dry-run`: the item *would* have been created.
    WouldCreate,
    /// An equivalent item already exists in the destination.
    SkippedDuplicate,
    /// The create request failed; the batch went on.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// Human-readable dedup key of the item.
    pub key: String,
    pub outcome: ItemOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Totals and per-item outcomes of one reconciliation, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// `"scheduled-actions"` or `"entries"`.
    pub kind: &'static str,
    pub source: EnvironmentRef,
    pub destination: EnvironmentRef,
    pub dry_run: bool,
    pub fetched: usize,
    pub skipped: usize,
    pub created: usize,
    pub would_create: usize,
    pub failed: usize,
    pub items: Vec<ItemReport>,
}

impl ReconciliationReport {
    pub fn new(kind: &'static str, source: &EnvironmentRef, destination: &EnvironmentRef, dry_run: bool) -> Self {
        Self {
            kind,
            source: source.clone(),
            destination: destination.clone(),
            dry_run,
            fetched: 0,
            skipped: 0,
            created: 0,
            would_create: 0,
            failed: 0,
            items: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, key: String, outcome: ItemOutcome, error: Option<String>) {
        match outcome {
            ItemOutcome::Created => self.created += 1,
            ItemOutcome::WouldCreate => self.would_create += 1,
            ItemOutcome::SkippedDuplicate => self.skipped += 1,
            ItemOutcome::Failed => self.failed += 1,
        }
        self.items.push(ItemReport {
            key,
            outcome,
            error,
        });
    }

    /// `true` when nothing needed to change.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.would_create == 0 && self.failed == 0
    }
}
