//! Engine configuration and startup validation.
//!
//! All paths the engine touches are validated or created once at
//! startup. Any failure here is fatal: the polling loop must not start
//! against a root that does not exist or a journal that cannot be
//! created.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Everything the engine needs to run, resolved before the first cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory tree to watch.
    pub watch_root: PathBuf,
    /// Durable journal store (`<record_id>, <path>` lines).
    pub journal_path: PathBuf,
    /// Directory receiving one placeholder per journal record.
    pub mirror_dir: PathBuf,
    /// Optional newline-delimited exclusion list, re-read every cycle.
    pub exclude_file: Option<PathBuf>,
    /// Age threshold in seconds (strictly-greater-than comparison).
    pub threshold_secs: u64,
    /// Sleep between cycles, in seconds.
    pub poll_interval_secs: u64,
}

impl EngineConfig {
    /// Validate the watch root and create the journal and mirror
    /// areas. The exclusion list is deliberately not checked: it may
    /// appear, disappear, or change while the engine runs.
    pub fn prepare(&self) -> Result<(), EngineError> {
        if !self.watch_root.is_dir() {
            return Err(EngineError::config(
                &self.watch_root,
                "watch root does not exist or is not a directory",
            ));
        }

        fs::create_dir_all(&self.mirror_dir).map_err(|err| {
            EngineError::config(&self.mirror_dir, format!("cannot create mirror directory: {err}"))
        })?;

        if let Some(parent) = self.journal_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    EngineError::config(parent, format!("cannot create journal parent: {err}"))
                })?;
            }
        }

        crate::journal::Journal::new(&self.journal_path)
            .create_if_absent()
            .map_err(|err| {
                EngineError::config(&self.journal_path, format!("cannot create journal: {err}"))
            })?;

        Ok(())
    }
}
