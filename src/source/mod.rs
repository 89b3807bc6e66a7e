//! Remote source abstraction.
//!
//! A remote source enumerates a versioned file tree and serves item
//! content. Connecting and authenticating are entirely the implementor's
//! concern; the reconciliation core only consumes listings and byte
//! streams.

pub mod http;

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::TetherError;

/// One entry of a remote listing.
///
/// `url` is the stable identity. `version` is an opaque server token that
/// changes whenever the item's content or structure changes; equality of
/// version tokens is the sole authority for "unchanged".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub url: String,
    pub name: String,
    pub folder: String,
    pub version: String,
    pub is_directory: bool,
}

/// Full listing of the configured remote root at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteListing {
    /// Opaque whole-tree version token (e.g. a changeset id).
    pub latest_version: String,
    pub items: Vec<RemoteItem>,
}

/// The version-control backend seam.
///
/// `Send + Sync` so one source instance can serve concurrent downloads.
pub trait RemoteSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch the complete current listing for the configured root.
    ///
    /// A failure here aborts the whole pass; there is no meaningful diff
    /// against a partial listing.
    fn fetch_listing(&self) -> Result<RemoteListing, TetherError>;

    /// Stream one item's content into `dest`, returning the byte count.
    fn fetch_content(&self, item: &RemoteItem, dest: &mut dyn Write) -> Result<u64, TetherError>;
}
