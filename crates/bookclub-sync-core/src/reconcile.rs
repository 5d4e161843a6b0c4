//! Reconciliation planning.
//!
//! Given the freshly computed statistics ("new state") and the rows already
//! persisted in the remote table ("existing state"), [`plan`] partitions
//! every new book into exactly one of:
//!
//! | Bucket | Condition | Action |
//! |--------|-----------|--------|
//! | `inserts` | no remote row for the key | create |
//! | `updates` | remote row differs on average or favorites | update by remote id |
//! | `unchanged` | remote row matches at one-decimal precision | none |
//!
//! Books present only in the existing state are listed in
//! [`ReconciliationPlan::untracked`] and never archived or deleted.
//!
//! Planning is pure. The application crate executes a plan against a
//! [`RemoteStore`](crate::store::RemoteStore).

use std::collections::{BTreeMap, BTreeSet};

use tracing::warn;

use crate::error::{Result, SyncError};
use crate::models::{BookKey, BookStats, ExistingStats};
use crate::store::RemoteRow;

/// A row that must be rewritten with new statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpdate {
    pub remote_id: String,
    pub stats: BookStats,
}

/// The set of remote mutations one sync run will perform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPlan {
    pub updates: BTreeMap<BookKey, PendingUpdate>,
    pub inserts: BTreeMap<BookKey, BookStats>,
    pub unchanged: BTreeSet<BookKey>,
    /// Remote books absent from the new batch. Reported only.
    pub untracked: BTreeSet<BookKey>,
}

impl ReconciliationPlan {
    /// True when executing the plan would not touch the remote table.
    pub fn is_noop(&self) -> bool {
        self.updates.is_empty() && self.inserts.is_empty()
    }

    /// Number of remote mutations the plan calls for.
    pub fn mutation_count(&self) -> usize {
        self.updates.len() + self.inserts.len()
    }
}

/// Diff new statistics against persisted ones.
pub fn plan(
    new_state: &BTreeMap<BookKey, BookStats>,
    existing_state: &BTreeMap<BookKey, ExistingStats>,
) -> ReconciliationPlan {
    let mut plan = ReconciliationPlan::default();

    for (key, stats) in new_state {
        match existing_state.get(key) {
            None => {
                plan.inserts.insert(key.clone(), *stats);
            }
            Some(existing) if stats.matches(existing) => {
                plan.unchanged.insert(key.clone());
            }
            Some(existing) => {
                plan.updates.insert(
                    key.clone(),
                    PendingUpdate {
                        remote_id: existing.remote_id.clone(),
                        stats: *stats,
                    },
                );
            }
        }
    }

    plan.untracked = existing_state
        .keys()
        .filter(|k| !new_state.contains_key(*k))
        .cloned()
        .collect();

    plan
}

/// Validate remote rows into the existing-state map.
///
/// Titles are re-normalized since older writers may not have done so. Any
/// row missing a title, average, or favorites count, or carrying a
/// negative or fractional favorites count, fails the whole read with
/// [`SyncError::MalformedRemoteRecord`]. When two rows normalize to the same
/// key, the first one wins and the duplicate is logged.
pub fn existing_state(rows: &[RemoteRow]) -> Result<BTreeMap<BookKey, ExistingStats>> {
    let mut existing = BTreeMap::new();

    for row in rows {
        let (key, stats) = parse_row(row)?;
        if existing.contains_key(&key) {
            warn!(
                book = %key,
                remote_id = %row.id,
                "duplicate remote row for book; keeping the first one"
            );
            continue;
        }
        existing.insert(key, stats);
    }

    Ok(existing)
}

fn parse_row(row: &RemoteRow) -> Result<(BookKey, ExistingStats)> {
    let malformed = |reason: &str| SyncError::MalformedRemoteRecord {
        id: row.id.clone(),
        reason: reason.to_string(),
    };

    let title = row
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| malformed("missing title"))?;
    let average = row.average.ok_or_else(|| malformed("missing average rating"))?;
    let favorites = row.favorites.ok_or_else(|| malformed("missing favorites count"))?;

    if favorites < 0.0 || favorites.fract() != 0.0 || favorites > f64::from(u32::MAX) {
        return Err(malformed("favorites count is not a non-negative integer"));
    }

    Ok((
        BookKey::new(title),
        ExistingStats {
            remote_id: row.id.clone(),
            average,
            favorites: favorites as u32,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> BookKey {
        BookKey::new(s)
    }

    fn existing(id: &str, average: f64, favorites: u32) -> ExistingStats {
        ExistingStats {
            remote_id: id.to_string(),
            average,
            favorites,
        }
    }

    fn row(id: &str, title: Option<&str>, average: Option<f64>, favorites: Option<f64>) -> RemoteRow {
        RemoteRow {
            id: id.to_string(),
            title: title.map(str::to_string),
            average,
            favorites,
        }
    }

    #[test]
    fn insert_when_absent() {
        let new = BTreeMap::from([(key("Dune"), BookStats::new(4.5, 2))]);
        let plan = plan(&new, &BTreeMap::new());

        assert_eq!(plan.inserts.get(&key("Dune")), Some(&BookStats::new(4.5, 2)));
        assert!(plan.updates.is_empty());
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn update_when_values_differ() {
        let new = BTreeMap::from([(key("Dune"), BookStats::new(4.5, 2))]);
        let old = BTreeMap::from([(key("Dune"), existing("r1", 4.0, 1))]);
        let plan = plan(&new, &old);

        assert_eq!(
            plan.updates.get(&key("Dune")),
            Some(&PendingUpdate {
                remote_id: "r1".to_string(),
                stats: BookStats::new(4.5, 2),
            })
        );
        assert!(plan.inserts.is_empty());
    }

    #[test]
    fn update_when_only_favorites_differ() {
        let new = BTreeMap::from([(key("Dune"), BookStats::new(4.0, 2))]);
        let old = BTreeMap::from([(key("Dune"), existing("r1", 4.0, 1))]);
        assert_eq!(plan(&new, &old).updates.len(), 1);
    }

    #[test]
    fn unchanged_when_equal() {
        let new = BTreeMap::from([(key("Dune"), BookStats::new(4.5, 2))]);
        let old = BTreeMap::from([(key("Dune"), existing("r1", 4.5, 2))]);
        let plan = plan(&new, &old);

        assert!(plan.is_noop());
        assert!(plan.unchanged.contains(&key("Dune")));
    }

    #[test]
    fn extra_remote_precision_is_not_a_change() {
        let new = BTreeMap::from([(key("Dune"), BookStats::new(13.0 / 3.0, 0))]);
        let old = BTreeMap::from([(key("Dune"), existing("r1", 4.333_333, 0))]);
        assert!(plan(&new, &old).is_noop());
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let new = BTreeMap::from([
            (key("Dune"), BookStats::new(4.5, 2)),
            (key("Emma"), BookStats::new(3.0, 0)),
            (key("The Hobbit"), BookStats::new(5.0, 3)),
            (key("Ulysses"), BookStats::new(1.0, 0)),
        ]);
        let old = BTreeMap::from([
            (key("Dune"), existing("r1", 4.0, 1)),
            (key("Emma"), existing("r2", 3.0, 0)),
            (key("Walden"), existing("r3", 2.0, 0)),
        ]);
        let plan = plan(&new, &old);

        for k in new.keys() {
            let hits = [
                plan.updates.contains_key(k),
                plan.inserts.contains_key(k),
                plan.unchanged.contains(k),
            ]
            .iter()
            .filter(|b| **b)
            .count();
            assert_eq!(hits, 1, "{k} landed in {hits} buckets");
        }
        assert_eq!(
            plan.updates.len() + plan.inserts.len() + plan.unchanged.len(),
            new.len()
        );
        assert_eq!(plan.mutation_count(), 3);
    }

    #[test]
    fn existing_only_books_are_untracked_not_removed() {
        let new = BTreeMap::from([(key("Dune"), BookStats::new(4.5, 2))]);
        let old = BTreeMap::from([
            (key("Dune"), existing("r1", 4.5, 2)),
            (key("Walden"), existing("r2", 2.0, 0)),
        ]);
        let plan = plan(&new, &old);

        assert!(plan.is_noop());
        assert!(!plan.updates.contains_key(&key("Walden")));
        assert!(!plan.inserts.contains_key(&key("Walden")));
        assert_eq!(plan.untracked, BTreeSet::from([key("Walden")]));
    }

    #[test]
    fn existing_state_normalizes_titles() {
        let rows = vec![row("r1", Some("  the HOBBIT"), Some(4.0), Some(1.0))];
        let state = existing_state(&rows).unwrap();
        assert_eq!(state[&key("The Hobbit")], existing("r1", 4.0, 1));
    }

    #[test]
    fn existing_state_rejects_missing_fields() {
        let cases = [
            row("r1", None, Some(4.0), Some(1.0)),
            row("r2", Some("   "), Some(4.0), Some(1.0)),
            row("r3", Some("Dune"), None, Some(1.0)),
            row("r4", Some("Dune"), Some(4.0), None),
            row("r5", Some("Dune"), Some(4.0), Some(-1.0)),
            row("r6", Some("Dune"), Some(4.0), Some(1.5)),
        ];
        for case in cases {
            match existing_state(std::slice::from_ref(&case)) {
                Err(SyncError::MalformedRemoteRecord { id, .. }) => assert_eq!(id, case.id),
                other => panic!("expected MalformedRemoteRecord for {}, got {other:?}", case.id),
            }
        }
    }

    #[test]
    fn duplicate_remote_titles_keep_first() {
        let rows = vec![
            row("r1", Some("Dune"), Some(4.0), Some(1.0)),
            row("r2", Some("DUNE"), Some(2.0), Some(0.0)),
        ];
        let state = existing_state(&rows).unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state[&key("Dune")].remote_id, "r1");
    }
}
