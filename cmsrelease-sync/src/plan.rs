//! One-way diff: replay source items whose key is absent from the destination.
//!
//! Items are applied strictly in source order, one at a time. A key is added
//! to the index only after its create succeeds (or would succeed, in a dry
//! run), so repeated source items are created once and a failed item does
//! not shadow a later equivalent one.

use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use cmsrelease_gateway::GatewayError;

use crate::report::{ItemOutcome, ReconciliationReport};

/// Keys already present in the destination.
#[derive(Debug, Clone)]
pub struct KeyIndex<K> {
    keys: HashSet<K>,
}

impl<K: Eq + Hash> KeyIndex<K> {
    pub fn from_items<T>(items: &[T], key_of: impl Fn(&T) -> K) -> Self {
        Self {
            keys: items.iter().map(key_of).collect(),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn insert(&mut self, key: K) -> bool {
        self.keys.insert(key)
    }
}

/// Replay `source` into the destination described by `index`.
///
/// `create` is only called for missing items and never in a dry run. Its
/// failures are recorded per item; the loop always continues.
pub fn replay<T, K, C>(
    report: &mut ReconciliationReport,
    source: &[T],
    index: &mut KeyIndex<K>,
    key_of: impl Fn(&T) -> K,
    mut create: C,
) where
    K: Eq + Hash + Display,
    C: FnMut(&T) -> Result<(), GatewayError>,
{
    report.fetched = source.len();
    for item in source {
        let key = key_of(item);
        let label = key.to_string();

        if index.contains(&key) {
            tracing::debug!("already present, skipping: {}", label);
            report.record(label, ItemOutcome::SkippedDuplicate, None);
            continue;
        }

        if report.dry_run {
            tracing::info!("[dry-run] would create: {}", label);
            index.insert(key);
            report.record(label, ItemOutcome::WouldCreate, None);
            continue;
        }

        match create(item) {
            Ok(()) => {
                tracing::info!("created: {}", label);
                index.insert(key);
                report.record(label, ItemOutcome::Created, None);
            }
            Err(e) => {
                tracing::warn!("failed to create {}: {}", label, e);
                report.record(label, ItemOutcome::Failed, Some(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use cmsrelease_core::EnvironmentRef;

    use super::*;

    fn report(dry_run: bool) -> ReconciliationReport {
        ReconciliationReport::new(
            "entries",
            &EnvironmentRef::from("a"),
            &EnvironmentRef::from("b"),
            dry_run,
        )
    }

    #[test]
    fn only_missing_keys_are_created_in_source_order() {
        let mut index = KeyIndex::from_items(&["b"], |s: &&str| s.to_string());
        let mut created = Vec::new();
        let mut report = report(false);
        replay(&mut report, &["c", "b", "a"], &mut index, |s| s.to_string(), |s| {
            created.push(s.to_string());
            Ok(())
        });
        assert_eq!(created, vec!["c", "a"]);
        assert_eq!((report.fetched, report.created, report.skipped), (3, 2, 1));
    }

    #[test]
    fn repeated_source_item_is_created_once() {
        let mut index = KeyIndex::from_items(&[] as &[&str], |s| s.to_string());
        let mut calls = 0;
        let mut report = report(false);
        replay(&mut report, &["a", "a"], &mut index, |s| s.to_string(), |_| {
            calls += 1;
            Ok(())
        });
        assert_eq!(calls, 1);
        assert_eq!((report.created, report.skipped), (1, 1));
    }

    #[test]
    fn failure_is_counted_and_does_not_stop_the_batch() {
        let mut index = KeyIndex::from_items(&[] as &[&str], |s| s.to_string());
        let mut report = report(false);
        replay(&mut report, &["bad", "good"], &mut index, |s| s.to_string(), |s| {
            if *s == "bad" {
                Err(GatewayError::Unavailable("boom".to_string()))
            } else {
                Ok(())
            }
        });
        assert_eq!((report.created, report.failed), (1, 1));
        assert_eq!(report.items[0].outcome, ItemOutcome::Failed);
        assert!(report.items[0].error.as_deref().unwrap_or("").contains("boom"));
        assert!(!index.contains(&"bad".to_string()));
    }

    #[test]
    fn dry_run_never_calls_create() {
        let mut index = KeyIndex::from_items(&[] as &[&str], |s| s.to_string());
        let mut report = report(true);
        replay(&mut report, &["a"], &mut index, |s| s.to_string(), |_| {
            panic!("create called in dry run")
        });
        assert_eq!((report.created, report.would_create), (0, 1));
    }
}
