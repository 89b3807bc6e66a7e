//! Applies a single Added/Modified change to the local working tree.
//!
//! Downloads into a sibling temp file, compares byte-for-byte against any
//! existing file, and only replaces when content actually differs. An
//! unchanged file keeps its bytes and timestamps, which keeps downstream
//! build caches warm even when the server bumps version tokens.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::TetherError;
use crate::source::{RemoteItem, RemoteListing, RemoteSource};
use crate::store::diff::{Change, SourceRef};

/// What materialization did to the local path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No file existed; the download was moved into place.
    Created(u64),
    /// A file existed with different content and was atomically replaced.
    Replaced(u64),
    /// The downloaded bytes matched the existing file; nothing was written.
    Unchanged(u64),
}

impl Outcome {
    pub fn bytes(&self) -> u64 {
        match self {
            Outcome::Created(n) | Outcome::Replaced(n) | Outcome::Unchanged(n) => *n,
        }
    }
}

/// Map a change back to its live listing item.
///
/// This is the one seam that couples a change to the concrete remote
/// backend: `Cached` metadata (Removed changes) has nothing to download.
fn resolve<'a>(listing: &'a RemoteListing, change: &Change) -> Result<&'a RemoteItem, TetherError> {
    let missing = || TetherError::Resolution {
        url: change.entry.url.clone(),
    };

    match change.source {
        SourceRef::Listed(idx) => listing.items.get(idx).ok_or_else(missing),
        SourceRef::Cached => Err(missing()),
    }
}

/// Ensure the file at `local_path` holds the item's current remote content.
///
/// Fresh content is always fetched; the existing file is replaced only if
/// the bytes differ, and the replace is an atomic rename. Failed downloads
/// leave no temp file behind.
pub fn materialize(
    source: &dyn RemoteSource,
    listing: &RemoteListing,
    change: &Change,
    local_path: &Path,
) -> Result<Outcome, TetherError> {
    let item = resolve(listing, change)?;

    if let Some(parent) = local_path.parent() {
        fs::create_dir_all(parent).map_err(|e| TetherError::local_io(parent, e))?;
    }

    let tmp = temp_path(local_path);
    let bytes = match download(source, item, &tmp) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };

    if !local_path.exists() {
        fs::rename(&tmp, local_path).map_err(|e| TetherError::local_io(local_path, e))?;
        return Ok(Outcome::Created(bytes));
    }

    if files_equal(&tmp, local_path)? {
        let _ = fs::remove_file(&tmp);
        return Ok(Outcome::Unchanged(bytes));
    }

    fs::rename(&tmp, local_path).map_err(|e| TetherError::local_io(local_path, e))?;
    Ok(Outcome::Replaced(bytes))
}

/// Sibling temp path that stays unique per item, so concurrent
/// materializations of different files in one folder cannot collide.
fn temp_path(local_path: &Path) -> PathBuf {
    let mut name = local_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp.{}", std::process::id()));
    local_path.with_file_name(name)
}

fn download(source: &dyn RemoteSource, item: &RemoteItem, tmp: &Path) -> Result<u64, TetherError> {
    let file = File::create(tmp).map_err(|e| TetherError::local_io(tmp, e))?;
    let mut writer = BufWriter::new(file);

    let bytes = source.fetch_content(item, &mut writer)?;
    writer
        .flush()
        .map_err(|e| TetherError::local_io(tmp, e))?;

    Ok(bytes)
}

/// Byte-for-byte comparison: length first, then buffered chunks.
fn files_equal(a: &Path, b: &Path) -> Result<bool, TetherError> {
    let len_a = fs::metadata(a).map_err(|e| TetherError::local_io(a, e))?.len();
    let len_b = fs::metadata(b).map_err(|e| TetherError::local_io(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }

    let mut reader_a = BufReader::new(File::open(a).map_err(|e| TetherError::local_io(a, e))?);
    let mut reader_b = BufReader::new(File::open(b).map_err(|e| TetherError::local_io(b, e))?);

    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];

    loop {
        let n_a = read_full(&mut reader_a, &mut buf_a).map_err(|e| TetherError::local_io(a, e))?;
        let n_b = read_full(&mut reader_b, &mut buf_b).map_err(|e| TetherError::local_io(b, e))?;

        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Fill `buf` as far as the reader allows; short only at end of file.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
