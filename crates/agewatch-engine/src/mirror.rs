//! Expired mirror.
//!
//! Side directory holding one placeholder file per live journal
//! record, named `<record_id>.txt`, whose sole content is the original
//! file's path. The mirror is written before the corresponding journal
//! append; a failed placeholder write aborts the whole aging event for
//! that cycle (see the engine), so the journal never points at a
//! placeholder that was never created. Orphan placeholders from the
//! opposite failure order are swept by the reconciler.

use crate::error::EngineError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// File extension for placeholder artifacts.
const PLACEHOLDER_EXT: &str = "txt";

/// Handle on the mirror directory.
#[derive(Debug, Clone)]
pub struct ExpiredMirror {
    dir: PathBuf,
}

impl ExpiredMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn placeholder_path(&self, record_id: &str) -> PathBuf {
        self.dir.join(format!("{record_id}.{PLACEHOLDER_EXT}"))
    }

    /// Write the placeholder for a record. Content is exactly the
    /// original path plus a trailing newline.
    pub fn write(&self, record_id: &str, original_path: &Path) -> Result<(), EngineError> {
        fs::write(
            self.placeholder_path(record_id),
            format!("{}\n", original_path.display()),
        )
        .map_err(|source| EngineError::Mirror {
            record_id: record_id.to_string(),
            source,
        })
    }

    /// Delete a placeholder. An already-absent placeholder is fine:
    /// external cleanup of the mirror directory is tolerated.
    pub fn remove(&self, record_id: &str) -> std::io::Result<bool> {
        match fs::remove_file(self.placeholder_path(record_id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// List `(record_id, stored original path)` for every placeholder
    /// currently in the mirror directory. Unreadable entries are
    /// skipped with a warning.
    pub fn entries(&self) -> Vec<(String, PathBuf)> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), %err, "mirror directory unreadable");
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for item in read_dir {
            let item = match item {
                Ok(i) => i,
                Err(_) => continue,
            };
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(PLACEHOLDER_EXT) {
                continue;
            }
            let Some(record_id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(content) => {
                    entries.push((record_id.to_string(), PathBuf::from(content.trim_end())));
                }
                Err(err) => {
                    tracing::warn!(placeholder = %path.display(), %err, "skipping unreadable placeholder");
                }
            }
        }
        entries
    }
}
