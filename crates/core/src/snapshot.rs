//! Snapshot of the watched tree at one point in time

use crate::record::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::path::{Path, PathBuf};

/// Mapping from absolute path to the record captured for it
///
/// Uses a BTreeMap so iteration (and therefore diffing) is ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    entries: BTreeMap<PathBuf, FileRecord>,
}

impl Snapshot {
    /// Create a new empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, keyed by its own path
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.entries.insert(record.path.clone(), record)
    }

    /// Get the record for a path
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.entries.get(path)
    }

    /// Check whether a path is present
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Remove a single path
    pub fn remove(&mut self, path: &Path) -> Option<FileRecord> {
        self.entries.remove(path)
    }

    /// Remove a path and everything below it
    ///
    /// Returns the number of records removed.
    pub fn remove_subtree(&mut self, root: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, _| !path.starts_with(root));
        before - self.entries.len()
    }

    /// Remove a path and its immediate children
    pub fn remove_children(&mut self, root: &Path) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|path, _| path.as_path() != root && path.parent() != Some(root));
        before - self.entries.len()
    }

    /// Merge all records of another snapshot into this one
    pub fn extend(&mut self, other: Snapshot) {
        self.entries.extend(other.entries);
    }

    /// Keep only the records matching a predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&FileRecord) -> bool) {
        self.entries.retain(|_, record| keep(record));
    }

    /// Get the number of records in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(path, record)` in path order
    pub fn iter(&self) -> btree_map::Iter<'_, PathBuf, FileRecord> {
        self.entries.iter()
    }

    /// Iterate over paths in order
    pub fn paths(&self) -> btree_map::Keys<'_, PathBuf, FileRecord> {
        self.entries.keys()
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl IntoIterator for Snapshot {
    type Item = (PathBuf, FileRecord);
    type IntoIter = btree_map::IntoIter<PathBuf, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = (&'a PathBuf, &'a FileRecord);
    type IntoIter = btree_map::Iter<'a, PathBuf, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
