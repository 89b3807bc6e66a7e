//! Reconciliation pass driver.
//!
//! One pass runs load -> fetch listing -> diff -> apply -> persist.
//! Removals and directory creation are cheap local operations handled
//! inline; file downloads fan out across a bounded set of worker threads.
//! Item failures are isolated and collected; only successfully applied
//! items ever reach the snapshot store, so a failed item stays visible as
//! Added/Modified on the next pass.

pub mod materialize;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

use serde::Serialize;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::TetherError;
use crate::source::RemoteSource;
use crate::store::diff::{self, Change, ChangeKind, SourceRef};
use crate::store::snapshot::{SnapshotEntry, SnapshotStore};

/// Directory under the local root that mirrors the remote tree.
pub const SOURCE_DIR: &str = "Source";

/// One successfully applied change.
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub url: String,
    pub kind: ChangeKind,
    pub action: &'static str,
    pub bytes: u64,
}

/// One change that failed to apply. The identity stays out of the
/// persisted store so a later pass retries it.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub url: String,
    pub kind: ChangeKind,
    pub reason: String,
}

/// Result of one reconciliation pass.
#[derive(Debug, Serialize)]
pub struct PullResult {
    pub latest_version: String,
    pub applied: Vec<ItemReport>,
    pub failed: Vec<ItemFailure>,
    pub bytes_downloaded: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_memory_bytes: Option<usize>,
}

/// Pending changes, computed without applying anything.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    pub latest_version: String,
    pub changes: Vec<Change>,
}

/// Resolve the on-disk location of one entry under `<local_root>/Source`.
///
/// Folder components are joined one at a time; empty, `.` and `..`
/// segments are dropped so a hostile listing cannot escape the root.
pub fn local_path(local_root: &Path, entry: &SnapshotEntry) -> PathBuf {
    let mut path = local_root.join(SOURCE_DIR);

    for part in entry
        .folder
        .split(['/', '\\'])
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
    {
        path.push(part);
    }

    path.push(&entry.name);
    path
}

/// Compute the pending change list without touching the working tree.
pub fn preview(config: &Config, source: &dyn RemoteSource) -> Result<StatusResult, TetherError> {
    let store = SnapshotStore::load(&config.local_root)?;
    let listing = source.fetch_listing()?;
    let changes = diff::compute_changes(&store, &listing);

    Ok(StatusResult {
        latest_version: listing.latest_version,
        changes,
    })
}

/// Run one full reconciliation pass.
pub fn run(config: &Config, source: &dyn RemoteSource) -> Result<PullResult, TetherError> {
    let start = Instant::now();

    let mut store = SnapshotStore::load(&config.local_root)?;
    let listing = source.fetch_listing()?;
    let changes = diff::compute_changes(&store, &listing);

    if config.verbose {
        eprintln!(
            "{}: {} items at version {}, {} change(s) against the snapshot",
            source.name(),
            listing.items.len(),
            listing.latest_version,
            changes.len()
        );
    }

    let mut applied = Vec::new();
    let mut failed = Vec::new();
    let mut fresh: Vec<SnapshotEntry> = Vec::new();
    let mut removed_any = false;

    // downloads queue up for the workers; everything else applies inline
    let mut downloads: Vec<(&Change, SnapshotEntry, PathBuf)> = Vec::new();

    for change in &changes {
        match change.kind {
            ChangeKind::Removed => {
                let path = local_path(&config.local_root, &change.entry);
                match remove_local(&path, change.entry.is_directory) {
                    Ok(()) => {
                        store.remove(&change.entry.url);
                        removed_any = true;
                        applied.push(ItemReport {
                            url: change.entry.url.clone(),
                            kind: change.kind,
                            action: "deleted",
                            bytes: 0,
                        });
                    }
                    Err(e) => failed.push(ItemFailure {
                        url: change.entry.url.clone(),
                        kind: change.kind,
                        reason: e.to_string(),
                    }),
                }
            }
            ChangeKind::Added | ChangeKind::Modified => {
                // persist metadata from the listing, not the stale entry:
                // for Modified the change carries the old version
                let Some(entry) = fresh_entry(&listing, change) else {
                    failed.push(ItemFailure {
                        url: change.entry.url.clone(),
                        kind: change.kind,
                        reason: TetherError::Resolution {
                            url: change.entry.url.clone(),
                        }
                        .to_string(),
                    });
                    continue;
                };

                let path = local_path(&config.local_root, &entry);

                if entry.is_directory {
                    match fs::create_dir_all(&path) {
                        Ok(()) => {
                            applied.push(ItemReport {
                                url: entry.url.clone(),
                                kind: change.kind,
                                action: "directory",
                                bytes: 0,
                            });
                            fresh.push(entry);
                        }
                        Err(e) => failed.push(ItemFailure {
                            url: entry.url.clone(),
                            kind: change.kind,
                            reason: TetherError::local_io(&path, e).to_string(),
                        }),
                    }
                } else {
                    downloads.push((change, entry, path));
                }
            }
        }
    }

    if !downloads.is_empty() {
        let parallel = config.parallel.max(1);
        if config.verbose {
            eprintln!(
                "downloading {} file(s) across {} worker(s)",
                downloads.len(),
                parallel.min(downloads.len())
            );
        }

        let (tx, rx) = mpsc::channel();
        let chunk_size = downloads.len().div_ceil(parallel);

        std::thread::scope(|scope| {
            for chunk in downloads.chunks(chunk_size) {
                let tx = tx.clone();
                let listing = &listing;
                scope.spawn(move || {
                    for (change, entry, path) in chunk {
                        let result = materialize::materialize(source, listing, change, path);
                        // the session outlives every worker, send cannot fail
                        let _ = tx.send((entry.clone(), change.kind, result));
                    }
                });
            }
            drop(tx);

            for (entry, kind, result) in rx {
                match result {
                    Ok(outcome) => {
                        applied.push(ItemReport {
                            url: entry.url.clone(),
                            kind,
                            action: outcome_action(outcome),
                            bytes: outcome.bytes(),
                        });
                        fresh.push(entry);
                    }
                    Err(e) => failed.push(ItemFailure {
                        url: entry.url.clone(),
                        kind,
                        reason: e.to_string(),
                    }),
                }
            }
        });
    }

    // one persist with everything that applied; removals performed above
    // become durable here as part of the same write
    store.update_many(fresh)?;

    if removed_any {
        prune_empty_dirs(&config.local_root.join(SOURCE_DIR));
    }

    let bytes_downloaded = applied.iter().map(|a| a.bytes).sum();

    Ok(PullResult {
        latest_version: listing.latest_version,
        applied,
        failed,
        bytes_downloaded,
        duration_ms: Some(start.elapsed().as_millis()),
        peak_memory_bytes: memory_stats::memory_stats().map(|m| m.physical_mem),
    })
}

/// Fresh metadata for an Added/Modified change, taken from the listing
/// item the change points back to.
fn fresh_entry(listing: &crate::source::RemoteListing, change: &Change) -> Option<SnapshotEntry> {
    match change.source {
        SourceRef::Listed(idx) => listing.items.get(idx).map(SnapshotEntry::from),
        SourceRef::Cached => None,
    }
}

fn outcome_action(outcome: materialize::Outcome) -> &'static str {
    match outcome {
        materialize::Outcome::Created(_) => "created",
        materialize::Outcome::Replaced(_) => "replaced",
        materialize::Outcome::Unchanged(_) => "unchanged",
    }
}

/// Delete a local path; a path that is already gone counts as success.
fn remove_local(path: &Path, is_directory: bool) -> Result<(), TetherError> {
    let result = if is_directory {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TetherError::local_io(path, e)),
    }
}

/// Remove directories left empty after deletions. Best effort: a
/// non-empty directory just fails the remove and stays.
fn prune_empty_dirs(root: &Path) {
    if !root.exists() {
        return;
    }

    for entry in WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .flatten()
    {
        if entry.file_type().is_dir() {
            let _ = fs::remove_dir(entry.path());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(folder: &str, name: &str) -> SnapshotEntry {
        SnapshotEntry {
            name: name.to_string(),
            folder: folder.to_string(),
            version: "1".to_string(),
            url: format!("{folder}/{name}"),
            is_directory: false,
        }
    }

    #[test]
    fn local_path_joins_folder_segments() {
        let path = local_path(Path::new("/work"), &entry("/src/deep", "a.txt"));
        assert_eq!(path, Path::new("/work/Source/src/deep/a.txt"));
    }

    #[test]
    fn local_path_accepts_backslash_folders() {
        let path = local_path(Path::new("/work"), &entry("\\src\\deep\\", "a.txt"));
        assert_eq!(path, Path::new("/work/Source/src/deep/a.txt"));
    }

    #[test]
    fn local_path_strips_traversal_segments() {
        let path = local_path(Path::new("/work"), &entry("/../../etc", "passwd"));
        assert_eq!(path, Path::new("/work/Source/etc/passwd"));
    }
}
