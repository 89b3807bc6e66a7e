//! Change detection between a remote listing and the snapshot store.
//!
//! Compares a freshly fetched listing against the cached snapshot and
//! reports changes:
//! - Added: identity unknown to the store
//! - Modified: identity known, version token differs
//! - Removed: identity in the store but absent from the listing
//!
//! Version equality is the sole authority for "unchanged": a rename under
//! the same identity without a version bump is not reported.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::source::RemoteListing;
use crate::store::snapshot::{SnapshotEntry, SnapshotStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// Where a change's content can be resolved from.
///
/// `Listed` is a non-owning index into the listing the change was computed
/// against. `Cached` marks metadata that exists only in the snapshot:
/// Removed changes have nothing live left to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRef {
    Cached,
    Listed(usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// For Added, metadata derived from the remote item. For Modified, the
    /// stale stored entry (so the caller knows what is being replaced).
    /// For Removed, the last known local entry.
    pub entry: SnapshotEntry,
    #[serde(skip)]
    pub source: SourceRef,
}

/// Compute the ordered change list for `listing` against `store`.
///
/// Works on a per-call copy of the store's mapping, never the store
/// itself, so consecutive calls against the same listing return identical
/// results. Added/Modified come first in listing order, then Removed in
/// snapshot key order; the order is stable for deterministic testing.
///
/// Duplicate identities within one listing are a caller contract
/// violation: no dedup happens here, each occurrence produces a change.
pub fn compute_changes(store: &SnapshotStore, listing: &RemoteListing) -> Vec<Change> {
    let mut working: BTreeMap<String, SnapshotEntry> = store
        .entries()
        .map(|e| (e.url.clone(), e.clone()))
        .collect();

    let mut changes = Vec::new();

    for (idx, item) in listing.items.iter().enumerate() {
        match working.remove(&item.url) {
            Some(stale) if stale.version != item.version => {
                // the stale entry leaves the working set so it cannot also
                // count as a survivor in the removal sweep below
                changes.push(Change {
                    kind: ChangeKind::Modified,
                    entry: stale,
                    source: SourceRef::Listed(idx),
                });
            }
            Some(unchanged) => {
                working.insert(item.url.clone(), unchanged);
            }
            None => {
                changes.push(Change {
                    kind: ChangeKind::Added,
                    entry: SnapshotEntry::from(item),
                    source: SourceRef::Listed(idx),
                });
            }
        }
    }

    let listed: HashSet<&str> = listing.items.iter().map(|i| i.url.as_str()).collect();

    for (url, entry) in working {
        if !listed.contains(url.as_str()) {
            changes.push(Change {
                kind: ChangeKind::Removed,
                entry,
                source: SourceRef::Cached,
            });
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RemoteItem;
    use tempfile::TempDir;

    fn item(url: &str, version: &str) -> RemoteItem {
        RemoteItem {
            url: url.to_string(),
            name: url.rsplit('/').next().unwrap_or(url).to_string(),
            folder: "/".to_string(),
            version: version.to_string(),
            is_directory: false,
        }
    }

    fn listing(items: Vec<RemoteItem>) -> RemoteListing {
        RemoteListing {
            latest_version: "tip".to_string(),
            items,
        }
    }

    /// Build a store seeded with the given (url, version) pairs. The
    /// TempDir must outlive the store, so it is returned alongside.
    fn seeded_store(entries: &[(&str, &str)]) -> (TempDir, SnapshotStore) {
        let dir = TempDir::new().unwrap();
        let mut store = SnapshotStore::load(dir.path()).unwrap();
        store
            .update_many(
                entries
                    .iter()
                    .map(|(url, version)| SnapshotEntry::from(&item(url, version))),
            )
            .unwrap();
        (dir, store)
    }

    #[test]
    fn unknown_item_is_added() {
        let (_dir, store) = seeded_store(&[]);
        let changes = compute_changes(&store, &listing(vec![item("/a.txt", "1")]));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].entry.url, "/a.txt");
        assert_eq!(changes[0].entry.version, "1");
        assert_eq!(changes[0].source, SourceRef::Listed(0));
    }

    #[test]
    fn version_bump_is_modified_with_stale_metadata() {
        let (_dir, store) = seeded_store(&[("/a.txt", "1")]);
        let changes = compute_changes(&store, &listing(vec![item("/a.txt", "2")]));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        // the change carries the old version so callers see what is replaced
        assert_eq!(changes[0].entry.version, "1");
        assert_eq!(changes[0].source, SourceRef::Listed(0));
    }

    #[test]
    fn vanished_item_is_removed() {
        let (_dir, store) = seeded_store(&[("/a.txt", "1")]);
        let changes = compute_changes(&store, &listing(vec![]));

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Removed);
        assert_eq!(changes[0].entry.url, "/a.txt");
        assert_eq!(changes[0].source, SourceRef::Cached);
    }

    #[test]
    fn equal_version_is_no_change() {
        let (_dir, store) = seeded_store(&[("/a.txt", "1")]);
        let changes = compute_changes(&store, &listing(vec![item("/a.txt", "1")]));

        assert!(changes.is_empty());
    }

    #[test]
    fn rename_without_version_bump_is_invisible() {
        let (_dir, store) = seeded_store(&[("/a.txt", "1")]);

        let mut renamed = item("/a.txt", "1");
        renamed.name = "renamed.txt".to_string();
        let changes = compute_changes(&store, &listing(vec![renamed]));

        assert!(changes.is_empty());
    }

    #[test]
    fn empty_both_sides_yields_nothing() {
        let (_dir, store) = seeded_store(&[]);
        let changes = compute_changes(&store, &listing(vec![]));
        assert!(changes.is_empty());
    }

    #[test]
    fn upserts_precede_removals_in_stable_order() {
        let (_dir, store) =
            seeded_store(&[("/gone-a.txt", "1"), ("/gone-b.txt", "1"), ("/mod.txt", "1")]);
        let changes = compute_changes(
            &store,
            &listing(vec![item("/new.txt", "1"), item("/mod.txt", "2")]),
        );

        let kinds: Vec<(ChangeKind, &str)> = changes
            .iter()
            .map(|c| (c.kind, c.entry.url.as_str()))
            .collect();

        // Added/Modified in listing order, then Removed in key order
        assert_eq!(
            kinds,
            vec![
                (ChangeKind::Added, "/new.txt"),
                (ChangeKind::Modified, "/mod.txt"),
                (ChangeKind::Removed, "/gone-a.txt"),
                (ChangeKind::Removed, "/gone-b.txt"),
            ]
        );
    }

    #[test]
    fn diff_does_not_mutate_the_store() {
        let (_dir, store) = seeded_store(&[("/a.txt", "1"), ("/b.txt", "1")]);
        let remote = listing(vec![item("/a.txt", "2")]);

        let first = compute_changes(&store, &remote);
        let second = compute_changes(&store, &remote);

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.kind, b.kind);
            assert_eq!(a.entry, b.entry);
            assert_eq!(a.source, b.source);
        }
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn duplicate_listing_urls_produce_one_change_each() {
        let (_dir, store) = seeded_store(&[("/a.txt", "1")]);
        let changes = compute_changes(
            &store,
            &listing(vec![item("/a.txt", "2"), item("/a.txt", "2")]),
        );

        // first occurrence consumes the stored entry, second sees a miss
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[1].kind, ChangeKind::Added);
    }
}
