//! Directory scanner.
//!
//! Produces a fresh, complete snapshot of every regular file under the
//! watched root on each call. The scanner holds no state between
//! invocations; races with external deletion (a file vanishing between
//! the directory listing and the stat) skip that entry rather than
//! failing the whole pass.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One regular file observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Canonical absolute path (symlinks resolved). This is the file's
    /// identity everywhere in the engine.
    pub path: PathBuf,
    /// Last-modification time at the moment of the scan.
    pub modified: DateTime<Utc>,
}

/// Walk `root` recursively and return every regular file with its
/// canonical path and mtime.
pub fn scan_tree(root: &Path) -> Vec<ScannedFile> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        if !entry.file_type().is_file() {
            continue;
        }

        // metadata() re-stats; the file may be gone by now.
        let modified = match entry.metadata() {
            Ok(meta) => match meta.modified() {
                Ok(t) => DateTime::<Utc>::from(t),
                Err(_) => continue,
            },
            Err(_) => continue,
        };

        let path = match entry.path().canonicalize() {
            Ok(p) => p,
            Err(_) => continue,
        };

        files.push(ScannedFile { path, modified });
    }

    files
}

/// Path-set form of a scan, used by the reconciler to test whether an
/// original file still exists.
pub fn snapshot_paths(root: &Path) -> BTreeSet<PathBuf> {
    scan_tree(root).into_iter().map(|f| f.path).collect()
}
