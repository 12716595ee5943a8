//! Engine error types.
//!
//! Only configuration-time failures abort the engine; everything that
//! can go wrong for a single file or record during a cycle is handled
//! locally (skip, log, continue) and never surfaces here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A required path could not be validated or created at startup.
    /// The polling loop must not start when this is raised.
    #[error("configuration error for {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// The journal store could not be read or rewritten.
    #[error("journal I/O on {path}")]
    Journal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A mirror placeholder could not be written.
    #[error("mirror write for record {record_id}")]
    Mirror {
        record_id: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        EngineError::Config {
            path: path.into(),
            message: message.into(),
        }
    }
}
