//! Age evaluator.
//!
//! Classifies scanned files as fresh or aged against a threshold and a
//! remembered first-seen time, and emits each aging event exactly
//! once. The evaluator is pure over its inputs plus an injected clock,
//! which keeps the threshold arithmetic deterministic under test.
//!
//! First-seen seeding: a file observed for the first time is seeded
//! with its *modification time*, not the wall-clock of the first scan.
//! This answers "how long has the file been in the directory", and it
//! is stable across process restarts.

use crate::exclude::ExclusionSet;
use crate::scan::ScannedFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Emitted the first time a tracked file's elapsed time exceeds the
/// threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgingEvent {
    pub path: PathBuf,
    /// The first-seen baseline the elapsed time was computed from.
    pub first_seen: DateTime<Utc>,
}

/// Evaluate one scan pass.
///
/// `known_paths` holds every original path already journaled; files in
/// it are never re-emitted, which is what makes detection exactly-once
/// across cycles. `first_seen` is the process-lifetime baseline map and
/// is seeded here for files not yet tracked.
///
/// The threshold comparison is strict: a file aged exactly
/// `threshold_secs` is not flagged, one second past it is.
pub fn evaluate(
    scanned: &[ScannedFile],
    exclusions: &ExclusionSet,
    known_paths: &BTreeSet<PathBuf>,
    first_seen: &mut HashMap<PathBuf, DateTime<Utc>>,
    threshold_secs: i64,
    now: DateTime<Utc>,
) -> Vec<AgingEvent> {
    let mut events = Vec::new();

    for file in scanned {
        if exclusions.contains(&file.path) {
            continue;
        }
        if known_paths.contains(&file.path) {
            continue;
        }

        let baseline = *first_seen
            .entry(file.path.clone())
            .or_insert(file.modified);

        let elapsed = now.signed_duration_since(baseline);
        if elapsed.num_seconds() > threshold_secs {
            events.push(AgingEvent {
                path: file.path.clone(),
                first_seen: baseline,
            });
        }
    }

    events
}
