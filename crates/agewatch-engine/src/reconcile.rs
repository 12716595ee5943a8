//! Reconciler.
//!
//! Compares the journal against a fresh snapshot of the watched root
//! and removes entries whose original file no longer exists, deleting
//! the matching mirror placeholder as it goes. A second, independent
//! sweep of the mirror directory prunes placeholders that the journal
//! no longer references (or never did, after a partial failure), so
//! journal and mirror converge even when one of the two writes failed
//! in an earlier cycle.
//!
//! Cost is one full pass over records plus one over placeholders per
//! call. Fine for the intended scale (monitoring directories); not
//! meant for large record counts.

use crate::error::EngineError;
use crate::journal::Journal;
use crate::mirror::ExpiredMirror;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// What a reconciliation pass removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub records_removed: usize,
    pub placeholders_removed: usize,
}

/// Prune journal records and mirror placeholders whose original file
/// is absent from `snapshot`. Surviving records keep their relative
/// order in the rewritten journal.
pub fn reconcile(
    journal: &Journal,
    mirror: &ExpiredMirror,
    snapshot: &BTreeSet<PathBuf>,
) -> Result<ReconcileReport, EngineError> {
    let records = journal.load();
    let mut report = ReconcileReport::default();

    let mut dead_ids = BTreeSet::new();
    let mut live_ids = BTreeSet::new();
    for record in &records {
        if snapshot.contains(&record.original_path) {
            live_ids.insert(record.record_id.clone());
        } else {
            dead_ids.insert(record.record_id.clone());
        }
    }

    for id in &dead_ids {
        match mirror.remove(id) {
            Ok(true) => {
                report.placeholders_removed += 1;
                tracing::info!(record_id = %id, "removed placeholder for vanished original");
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(record_id = %id, %err, "failed to remove placeholder; will retry next pass");
            }
        }
    }

    if !dead_ids.is_empty() {
        report.records_removed = journal.remove_many(&dead_ids)?;
        tracing::info!(
            removed = report.records_removed,
            remaining = records.len() - report.records_removed,
            "reconciled journal against directory snapshot"
        );
    }

    // Independent mirror sweep: placeholders with no surviving record,
    // or whose stored path no longer exists, are drift from partial
    // failures and get pruned here.
    for (record_id, stored_path) in mirror.entries() {
        if live_ids.contains(&record_id) && snapshot.contains(&stored_path) {
            continue;
        }
        match mirror.remove(&record_id) {
            Ok(true) => {
                report.placeholders_removed += 1;
                tracing::info!(record_id = %record_id, "pruned orphan placeholder");
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(record_id = %record_id, %err, "failed to prune orphan placeholder");
            }
        }
    }

    Ok(report)
}
