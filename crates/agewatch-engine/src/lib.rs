//! Agewatch Engine
//!
//! Tracks how long files have been sitting in a watched directory
//! tree, records each file that outlives a threshold exactly once in a
//! durable journal, mirrors a placeholder per record into an "expired"
//! directory, and reconciles journal + mirror when originals vanish:
//!
//! ```text
//! ┌───────────┐    ┌───────────────┐    ┌─────────────────┐
//! │  Scanner  │───►│ Age Evaluator │───►│  Expiry Journal │
//! │ (walkdir) │    │ (first-seen + │    │  (one line per  │
//! └───────────┘    │  threshold)   │    │   aging event)  │
//!       │          └───────────────┘    └────────┬────────┘
//!       │                  ▲                     │
//!       │          ┌───────┴───────┐    ┌────────▼────────┐
//!       │          │ ExclusionSet  │    │  Expired Mirror │
//!       │          │ (per cycle)   │    │ (<id>.txt each) │
//!       │          └───────────────┘    └────────┬────────┘
//!       │                                        │
//!       └──────────────► Reconciler ◄────────────┘
//!                 (prunes dead records/placeholders)
//! ```
//!
//! The engine is single-threaded and poll-driven. External mutation of
//! the watched tree, the journal, and the mirror is tolerated by
//! skip-and-continue, never by locking. Only startup configuration
//! errors abort; nothing a single file or record does can crash a
//! cycle.

pub mod age;
pub mod config;
pub mod error;
pub mod exclude;
pub mod journal;
pub mod mirror;
pub mod reconcile;
pub mod scan;

pub use age::AgingEvent;
pub use config::EngineConfig;
pub use error::EngineError;
pub use exclude::ExclusionSet;
pub use journal::{Journal, JournalRecord};
pub use mirror::ExpiredMirror;
pub use reconcile::{reconcile, ReconcileReport};
pub use scan::{scan_tree, snapshot_paths, ScannedFile};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Summary of one detection cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Regular files seen by this cycle's scan.
    pub files_scanned: usize,
    /// Aging events emitted by the evaluator.
    pub aged: usize,
    /// Events durably journaled (placeholder + journal line).
    pub journaled: usize,
    /// Events abandoned this cycle because a write failed; they are
    /// retried on the next cycle.
    pub failed: usize,
}

/// The engine state object: first-seen baseline map plus journal and
/// mirror handles. Created once at process start, driven through every
/// cycle, dropped at exit. There is no global state.
pub struct AgeWatchEngine {
    config: EngineConfig,
    first_seen: HashMap<PathBuf, DateTime<Utc>>,
    journal: Journal,
    mirror: ExpiredMirror,
}

impl AgeWatchEngine {
    /// Validate the configuration (creating the journal and mirror
    /// areas) and build the engine. Fails rather than letting a loop
    /// start against an unusable configuration.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        config.prepare()?;
        let journal = Journal::new(&config.journal_path);
        let mirror = ExpiredMirror::new(&config.mirror_dir);
        Ok(Self {
            config,
            first_seen: HashMap::new(),
            journal,
            mirror,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn mirror(&self) -> &ExpiredMirror {
        &self.mirror
    }

    /// Number of paths currently carrying a first-seen baseline.
    pub fn tracked(&self) -> usize {
        self.first_seen.len()
    }

    /// Run one detection cycle at the current wall clock.
    pub fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now())
    }

    /// Run one detection cycle against an explicit clock: rebuild the
    /// exclusion set, scan, evaluate, and journal each aging event.
    ///
    /// Per event, the mirror placeholder is written first and the
    /// journal line second. A failed placeholder write abandons the
    /// event for this cycle (nothing is journaled, so the file is
    /// re-detected next cycle); a failed journal append after a
    /// successful placeholder write leaves an orphan placeholder for
    /// the reconciler to sweep.
    pub fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let exclusions = match &self.config.exclude_file {
            Some(path) => ExclusionSet::from_file(path),
            None => ExclusionSet::default(),
        };
        let known = self.journal.known_paths();
        let scanned = scan_tree(&self.config.watch_root);

        let events = age::evaluate(
            &scanned,
            &exclusions,
            &known,
            &mut self.first_seen,
            self.config.threshold_secs as i64,
            now,
        );

        let mut report = CycleReport {
            files_scanned: scanned.len(),
            aged: events.len(),
            ..CycleReport::default()
        };

        for event in events {
            let record_id = self.journal.next_record_id(now, &event.path);

            if let Err(err) = self.mirror.write(&record_id, &event.path) {
                tracing::warn!(path = %event.path.display(), %err, "placeholder write failed; event retried next cycle");
                report.failed += 1;
                continue;
            }
            if let Err(err) = self.journal.append(&record_id, &event.path) {
                tracing::warn!(path = %event.path.display(), %err, "journal append failed; placeholder left for reconciler");
                report.failed += 1;
                continue;
            }

            tracing::info!(
                path = %event.path.display(),
                record_id = %record_id,
                threshold_secs = self.config.threshold_secs,
                "file exceeded age threshold"
            );
            report.journaled += 1;
        }

        tracing::debug!(
            files_scanned = report.files_scanned,
            excluded = exclusions.len(),
            journaled = report.journaled,
            "cycle complete"
        );
        report
    }

    /// Sweep journal and mirror against a fresh directory snapshot,
    /// then drop first-seen baselines for paths that no longer exist.
    pub fn reconcile_cycle(&mut self) -> Result<ReconcileReport, EngineError> {
        let snapshot = snapshot_paths(&self.config.watch_root);
        let report = reconcile(&self.journal, &self.mirror, &snapshot)?;
        self.first_seen.retain(|path, _| snapshot.contains(path));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::fs;
    use tempfile::tempdir;

    fn engine(root: &std::path::Path, threshold_secs: u64) -> AgeWatchEngine {
        let watch_root = root.join("watched");
        fs::create_dir_all(&watch_root).unwrap();
        AgeWatchEngine::open(EngineConfig {
            watch_root,
            journal_path: root.join("journal.log"),
            mirror_dir: root.join("expired"),
            exclude_file: None,
            threshold_secs,
            poll_interval_secs: 1,
        })
        .unwrap()
    }

    #[test]
    fn aged_file_is_journaled_once() {
        let dir = tempdir().unwrap();
        let mut engine = engine(dir.path(), 10);
        fs::write(engine.config().watch_root.join("a.txt"), "a").unwrap();

        // The file's mtime is "now"; evaluate 15 seconds in the future.
        let later = Utc::now() + Duration::seconds(15);
        let first = engine.run_cycle_at(later);
        assert_eq!(first.journaled, 1);
        assert_eq!(engine.journal().load().len(), 1);
        assert_eq!(engine.mirror().entries().len(), 1);

        // Second cycle over unchanged state journals nothing new.
        let second = engine.run_cycle_at(later + Duration::seconds(60));
        assert_eq!(second.aged, 0);
        assert_eq!(engine.journal().load().len(), 1);
    }

    #[test]
    fn fresh_file_is_not_journaled() {
        let dir = tempdir().unwrap();
        let mut engine = engine(dir.path(), 3600);
        fs::write(engine.config().watch_root.join("a.txt"), "a").unwrap();

        let report = engine.run_cycle_at(Utc::now());
        assert_eq!(report.files_scanned, 1);
        assert_eq!(report.aged, 0);
        assert!(engine.journal().load().is_empty());
    }

    #[test]
    fn placeholder_content_matches_journal_record() {
        let dir = tempdir().unwrap();
        let mut engine = engine(dir.path(), 0);
        fs::write(engine.config().watch_root.join("a.txt"), "a").unwrap();

        engine.run_cycle_at(Utc::now() + Duration::seconds(30));

        let records = engine.journal().load();
        let entries = engine.mirror().entries();
        assert_eq!(records.len(), 1);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, records[0].record_id);
        assert_eq!(entries[0].1, records[0].original_path);
    }

    #[test]
    fn reconcile_drops_state_for_deleted_original() {
        let dir = tempdir().unwrap();
        let mut engine = engine(dir.path(), 0);
        let file = engine.config().watch_root.join("a.txt");
        fs::write(&file, "a").unwrap();

        engine.run_cycle_at(Utc::now() + Duration::seconds(30));
        assert_eq!(engine.tracked(), 1);

        fs::remove_file(&file).unwrap();
        let report = engine.reconcile_cycle().unwrap();
        assert_eq!(report.records_removed, 1);
        assert_eq!(report.placeholders_removed, 1);
        assert_eq!(engine.tracked(), 0);
        assert!(engine.journal().load().is_empty());
        assert!(engine.mirror().entries().is_empty());
    }
}
