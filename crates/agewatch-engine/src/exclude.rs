//! Exclusion resolver.
//!
//! Expands a raw exclusion list (files or directories) into the full
//! set of canonical paths to ignore. Directory entries expand to
//! themselves plus every descendant, so exclusion is transitively
//! inherited — including by files created after the list was last
//! read, because the set is rebuilt from the list on every cycle.
//!
//! A malformed list must never abort tracking: each entry that fails
//! to resolve is logged and dropped, and a missing list file simply
//! yields an empty set.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Canonical paths that are never evaluated for aging and never
/// journaled.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    paths: BTreeSet<PathBuf>,
}

impl ExclusionSet {
    /// Resolve raw entries into the exclusion set. Directories expand
    /// recursively; unresolvable entries are skipped with a warning.
    pub fn resolve<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut paths = BTreeSet::new();

        for entry in entries {
            let raw = entry.as_ref().trim();
            if raw.is_empty() {
                continue;
            }

            let resolved = match Path::new(raw).canonicalize() {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(entry = raw, %err, "skipping unresolvable exclusion entry");
                    continue;
                }
            };

            if resolved.is_dir() {
                for item in WalkDir::new(&resolved).follow_links(false) {
                    match item {
                        Ok(e) => {
                            let p = e.path().canonicalize().unwrap_or_else(|_| e.into_path());
                            paths.insert(p);
                        }
                        Err(err) => {
                            tracing::warn!(entry = raw, %err, "skipping unreadable excluded path");
                        }
                    }
                }
            } else {
                paths.insert(resolved);
            }
        }

        Self { paths }
    }

    /// Read a newline-delimited exclusion list and resolve it. A
    /// missing or unreadable file yields an empty set: the watcher
    /// keeps running without exclusions rather than stopping.
    pub fn from_file(list_path: &Path) -> Self {
        let content = match fs::read_to_string(list_path) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(path = %list_path.display(), %err, "exclusion list unreadable; excluding nothing");
                return Self::default();
            }
        };

        Self::resolve(content.lines())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_entry_resolves_to_itself() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("skip.txt");
        fs::write(&file, "x").unwrap();

        let set = ExclusionSet::resolve([file.to_string_lossy().to_string()]);
        assert!(set.contains(&file.canonicalize().unwrap()));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn directory_entry_expands_to_all_descendants() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("tmp");
        fs::create_dir_all(tmp.join("nested")).unwrap();
        fs::write(tmp.join("x.txt"), "x").unwrap();
        fs::write(tmp.join("nested/y.txt"), "y").unwrap();

        let set = ExclusionSet::resolve([tmp.to_string_lossy().to_string()]);
        assert!(set.contains(&tmp.canonicalize().unwrap()));
        assert!(set.contains(&tmp.join("x.txt").canonicalize().unwrap()));
        assert!(set.contains(&tmp.join("nested/y.txt").canonicalize().unwrap()));
    }

    #[test]
    fn bad_entries_are_dropped_not_fatal() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("real.txt");
        fs::write(&file, "x").unwrap();

        let set = ExclusionSet::resolve([
            "/no/such/path/anywhere".to_string(),
            String::new(),
            file.to_string_lossy().to_string(),
        ]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn missing_list_file_excludes_nothing() {
        let dir = tempdir().unwrap();
        let set = ExclusionSet::from_file(&dir.path().join("absent.list"));
        assert!(set.is_empty());
    }

    #[test]
    fn list_file_is_newline_delimited() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let list = dir.path().join("exclude.list");
        fs::write(&list, format!("{}\n\n{}\n", a.display(), b.display())).unwrap();

        let set = ExclusionSet::from_file(&list);
        assert_eq!(set.len(), 2);
    }
}
