//! Expiry journal.
//!
//! Durable store of every file that has triggered an aging event, and
//! the single source of truth for "already processed". The store is a
//! newline-delimited text file of `<record_id>, <original_path>`
//! lines: append-only in normal operation, rewritten wholesale when
//! records are removed.
//!
//! Durability contract: once [`Journal::append`] returns, a subsequent
//! [`Journal::load`] — even from a new process — includes the record.
//! Appends write the full line in one call and fsync before returning.
//!
//! Scale limit: removal is read-all/filter/write-all. That is an
//! explicit simplicity-over-scale choice; the `append`/`load`/
//! `remove_many` contract is the seam for an indexed store if record
//! counts ever grow beyond what a full rewrite tolerates.

use crate::error::EngineError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Second-precision, lexically sortable record-id format.
const RECORD_ID_FORMAT: &str = "%Y.%m.%d_%H.%M.%S";

/// Separator between the record id and the original path on disk.
const FIELD_SEPARATOR: &str = ", ";

/// One journaled aging event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub record_id: String,
    pub created_at: DateTime<Utc>,
    pub original_path: PathBuf,
}

/// Handle on the durable journal file.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the store empty if it does not exist yet.
    pub fn create_if_absent(&self) -> std::io::Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(|_| ())
    }

    /// Generate a record id for an event at `event_time`.
    ///
    /// Ids are the event second formatted as `%Y.%m.%d_%H.%M.%S`. When
    /// two events share a second, a suffix derived from the original
    /// file's stem disambiguates; a numeric counter covers the case of
    /// two same-second events on files with the same stem.
    pub fn next_record_id(&self, event_time: DateTime<Utc>, original_path: &Path) -> String {
        let base = event_time.format(RECORD_ID_FORMAT).to_string();
        let existing: BTreeSet<String> = self.load().into_iter().map(|r| r.record_id).collect();

        if !existing.contains(&base) {
            return base;
        }

        let stem = original_path
            .file_stem()
            .map(|s| s.to_string_lossy().replace([' ', ','], "_"))
            .unwrap_or_else(|| "record".to_string());

        let suffixed = format!("{base}_{stem}");
        if !existing.contains(&suffixed) {
            return suffixed;
        }

        let mut n = 2u32;
        loop {
            let candidate = format!("{suffixed}.{n}");
            if !existing.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Append one record. The whole line is written in a single call
    /// and synced to disk before this returns.
    pub fn append(&self, record_id: &str, original_path: &Path) -> Result<(), EngineError> {
        let line = format!("{record_id}{FIELD_SEPARATOR}{}\n", original_path.display());

        let io = |source| EngineError::Journal {
            path: self.path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io)?;
        file.write_all(line.as_bytes()).map_err(io)?;
        file.sync_data().map_err(io)?;
        Ok(())
    }

    /// Parse the store into records, in on-disk (append) order.
    ///
    /// A malformed line — missing separator or an id whose timestamp
    /// prefix does not parse — is skipped with a warning, never fatal.
    /// An absent store loads as empty.
    pub fn load(&self) -> Vec<JournalRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut records = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(path = %self.path.display(), line, "skipping malformed journal line");
                }
            }
        }
        records
    }

    /// Set of original paths currently journaled.
    pub fn known_paths(&self) -> BTreeSet<PathBuf> {
        self.load().into_iter().map(|r| r.original_path).collect()
    }

    /// Remove the given records, preserving the relative order of the
    /// survivors. Returns how many records were dropped.
    pub fn remove_many(&self, record_ids: &BTreeSet<String>) -> Result<usize, EngineError> {
        let records = self.load();
        let survivors: Vec<&JournalRecord> = records
            .iter()
            .filter(|r| !record_ids.contains(&r.record_id))
            .collect();
        let removed = records.len() - survivors.len();

        if removed == 0 {
            return Ok(0);
        }

        let mut content = String::new();
        for record in &survivors {
            content.push_str(&record.record_id);
            content.push_str(FIELD_SEPARATOR);
            content.push_str(&record.original_path.display().to_string());
            content.push('\n');
        }

        let io = |source| EngineError::Journal {
            path: self.path.clone(),
            source,
        };
        let mut file = fs::File::create(&self.path).map_err(io)?;
        file.write_all(content.as_bytes()).map_err(io)?;
        file.sync_data().map_err(io)?;
        Ok(removed)
    }

    /// Remove a single record.
    pub fn remove(&self, record_id: &str) -> Result<usize, EngineError> {
        let ids: BTreeSet<String> = [record_id.to_string()].into_iter().collect();
        self.remove_many(&ids)
    }
}

fn parse_line(line: &str) -> Option<JournalRecord> {
    let (record_id, path) = line.split_once(FIELD_SEPARATOR)?;
    if record_id.is_empty() || path.is_empty() {
        return None;
    }

    // The timestamp prefix is fixed-width; collision suffixes follow it.
    let prefix = record_id.get(..19)?;
    let created_at = NaiveDateTime::parse_from_str(prefix, RECORD_ID_FORMAT)
        .ok()?
        .and_utc();

    Some(JournalRecord {
        record_id: record_id.to_string(),
        created_at,
        original_path: PathBuf::from(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn event_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 45).unwrap()
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.log"));

        let id = journal.next_record_id(event_time(), Path::new("/w/a.txt"));
        assert_eq!(id, "2024.03.05_12.30.45");
        journal.append(&id, Path::new("/w/a.txt")).unwrap();

        let records = journal.load();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, id);
        assert_eq!(records[0].original_path, PathBuf::from("/w/a.txt"));
        assert_eq!(records[0].created_at, event_time());
    }

    #[test]
    fn load_survives_a_new_handle() {
        // Durability across "processes": a fresh handle on the same
        // path sees the appended record.
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");

        let writer = Journal::new(&path);
        let id = writer.next_record_id(event_time(), Path::new("/w/a.txt"));
        writer.append(&id, Path::new("/w/a.txt")).unwrap();

        let reader = Journal::new(&path);
        assert_eq!(reader.load().len(), 1);
        assert!(reader.known_paths().contains(Path::new("/w/a.txt")));
    }

    #[test]
    fn same_second_collision_gets_stem_suffix() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.log"));

        let first = journal.next_record_id(event_time(), Path::new("/w/a.txt"));
        journal.append(&first, Path::new("/w/a.txt")).unwrap();

        let second = journal.next_record_id(event_time(), Path::new("/w/b.txt"));
        assert_eq!(second, "2024.03.05_12.30.45_b");
        journal.append(&second, Path::new("/w/b.txt")).unwrap();

        // Same second, same stem, different directory: counter kicks in.
        let third = journal.next_record_id(event_time(), Path::new("/other/b.txt"));
        assert_eq!(third, "2024.03.05_12.30.45_b.2");
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("journal.log");
        fs::write(
            &path,
            "2024.03.05_12.30.45, /w/a.txt\n\
             no separator here\n\
             not-a-timestamp, /w/b.txt\n\
             2024.03.05_12.30.46, /w/c.txt\n",
        )
        .unwrap();

        let records = Journal::new(&path).load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_path, PathBuf::from("/w/a.txt"));
        assert_eq!(records[1].original_path, PathBuf::from("/w/c.txt"));
    }

    #[test]
    fn remove_preserves_survivor_order() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.log"));

        for (i, name) in ["a", "b", "c", "d"].iter().enumerate() {
            let t = event_time() + chrono::Duration::seconds(i as i64);
            let id = journal.next_record_id(t, Path::new(name));
            journal
                .append(&id, &PathBuf::from(format!("/w/{name}.txt")))
                .unwrap();
        }

        let ids: Vec<String> = journal.load().into_iter().map(|r| r.record_id).collect();
        let doomed: BTreeSet<String> = [ids[1].clone(), ids[2].clone()].into_iter().collect();
        assert_eq!(journal.remove_many(&doomed).unwrap(), 2);

        let after = journal.load();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].record_id, ids[0]);
        assert_eq!(after[1].record_id, ids[3]);
    }

    #[test]
    fn remove_of_absent_id_is_a_noop() {
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.log"));
        journal.create_if_absent().unwrap();
        assert_eq!(journal.remove("2099.01.01_00.00.00").unwrap(), 0);
    }

    #[test]
    fn record_ids_sort_lexically_by_time() {
        let earlier = event_time().format(RECORD_ID_FORMAT).to_string();
        let later = (event_time() + chrono::Duration::seconds(61))
            .format(RECORD_ID_FORMAT)
            .to_string();
        assert!(earlier < later);
    }

    #[test]
    fn path_containing_separator_still_parses() {
        // split_once keeps everything after the first separator, so a
        // path containing ", " survives a round trip.
        let dir = tempdir().unwrap();
        let journal = Journal::new(dir.path().join("journal.log"));
        let odd = Path::new("/w/report, final.txt");

        let id = journal.next_record_id(event_time(), odd);
        journal.append(&id, odd).unwrap();
        assert_eq!(journal.load()[0].original_path, odd);
    }
}
