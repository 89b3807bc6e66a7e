//! Snapshot persistence and change detection.
//!
//! The store is the durable memory of what the remote tree looked like the
//! last time a pass completed; the diff module compares that memory
//! against a fresh listing and emits the ordered change list the pull
//! driver applies.

pub mod diff;
pub mod snapshot;

pub use diff::{compute_changes, Change, ChangeKind, SourceRef};
pub use snapshot::{SnapshotEntry, SnapshotStore, SNAPSHOT_FILE};
