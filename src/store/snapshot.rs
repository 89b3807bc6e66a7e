//! Durable snapshot of the last-known remote tree.
//!
//! Persists a mapping from item identity (`url`) to metadata as a JSON
//! array at `<local_root>/local-repository.json`. Sorted keys keep the
//! persisted output and removal ordering deterministic. Every persist
//! fully overwrites the file via a sibling temp file and an atomic rename,
//! so a crash mid-write cannot truncate the previous snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TetherError;
use crate::source::RemoteItem;

pub const SNAPSHOT_FILE: &str = "local-repository.json";

/// Locally cached counterpart of a remote item, persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    pub folder: String,
    pub version: String,
    pub url: String,
    pub is_directory: bool,
}

impl From<&RemoteItem> for SnapshotEntry {
    fn from(item: &RemoteItem) -> Self {
        SnapshotEntry {
            name: item.name.clone(),
            folder: item.folder.clone(),
            version: item.version.clone(),
            url: item.url.clone(),
            is_directory: item.is_directory,
        }
    }
}

/// Persisted key-value cache of the last-known remote file tree.
///
/// Loaded once per session. `update_many` is the only bulk mutation path
/// and persists immediately; `remove` is in-memory until the next persist.
/// Dropping the store persists any unsaved removals.
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    entries: BTreeMap<String, SnapshotEntry>,
    dirty: bool,
}

impl SnapshotStore {
    /// Load the snapshot under `local_root`, or start empty if no file
    /// exists yet. A file that exists but does not parse is fatal.
    pub fn load(local_root: &Path) -> Result<Self, TetherError> {
        let path = local_root.join(SNAPSHOT_FILE);

        let entries = if path.exists() {
            let bytes = fs::read(&path).map_err(|e| TetherError::local_io(&path, e))?;
            let records: Vec<SnapshotEntry> =
                serde_json::from_slice(&bytes).map_err(|e| TetherError::StorageCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;

            records.into_iter().map(|r| (r.url.clone(), r)).collect()
        } else {
            BTreeMap::new()
        };

        Ok(SnapshotStore {
            path,
            entries,
            dirty: false,
        })
    }

    /// Lookup by identity. Absence is "unknown item", not an error.
    pub fn get(&self, url: &str) -> Option<&SnapshotEntry> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &SnapshotEntry> {
        self.entries.values()
    }

    /// Upsert each entry by identity, then persist the full mapping.
    ///
    /// The single bulk mutation path: call once per pass with every applied
    /// change so the persisted file never holds a mixed state.
    pub fn update_many(
        &mut self,
        updated: impl IntoIterator<Item = SnapshotEntry>,
    ) -> Result<(), TetherError> {
        for entry in updated {
            self.entries.insert(entry.url.clone(), entry);
        }

        self.persist()?;
        self.dirty = false;
        Ok(())
    }

    /// In-memory removal; durable on the next persist.
    pub fn remove(&mut self, url: &str) -> Option<SnapshotEntry> {
        let removed = self.entries.remove(url);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Overwrite the snapshot file with the current mapping.
    pub fn persist(&self) -> Result<(), TetherError> {
        let records: Vec<&SnapshotEntry> = self.entries.values().collect();
        let bytes = serde_json::to_vec_pretty(&records)
            .map_err(|e| TetherError::local_io(&self.path, std::io::Error::other(e)))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| TetherError::local_io(parent, e))?;
        }

        let tmp = self
            .path
            .with_extension(format!("json.tmp.{}", std::process::id()));
        fs::write(&tmp, &bytes).map_err(|e| TetherError::local_io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| TetherError::local_io(&self.path, e))?;

        Ok(())
    }
}

impl Drop for SnapshotStore {
    /// Final persist so removals applied during a pass survive even if the
    /// caller never reached `update_many`.
    fn drop(&mut self) {
        if self.dirty {
            let _ = self.persist();
        }
    }
}
