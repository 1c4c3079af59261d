//! Snapshot building
//!
//! Walks every watched root, applies the ignore rules and filter hooks, and
//! collects the surviving records into a fresh snapshot.

use crate::error::WatchError;
use crate::rules::{IgnoreRules, Verdict};
use pollwatch_core::{FileRecord, Snapshot};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// A watched root and whether its subtree is walked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub path: PathBuf,
    pub recursive: bool,
}

impl Root {
    pub fn new(path: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            path: path.into(),
            recursive,
        }
    }
}

/// Result of a complete walk over all roots
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Records of every admitted path
    pub snapshot: Snapshot,
    /// Roots that no longer exist
    pub vanished: Vec<PathBuf>,
}

/// Build a snapshot of all roots
///
/// A missing root is collected in `vanished` and the walk goes on; any other
/// failure aborts the whole build.
pub fn scan(roots: &[Root], rules: &IgnoreRules) -> Result<ScanOutcome, WatchError> {
    let mut outcome = ScanOutcome::default();

    for root in roots {
        match scan_root(root, rules) {
            Ok(snapshot) => outcome.snapshot.extend(snapshot),
            Err(WatchError::WatchedFileDeleted { path }) => outcome.vanished.push(path),
            Err(err) => return Err(err),
        }
    }

    debug!(
        "Scanned {} roots: {} entries, {} vanished",
        roots.len(),
        outcome.snapshot.len(),
        outcome.vanished.len()
    );
    Ok(outcome)
}

/// List a single root
///
/// Non-recursive directory roots yield the directory and its immediate
/// children; recursive roots yield the whole subtree. A root that is a
/// symlink is resolved; symlinks below it are recorded, not followed.
pub fn scan_root(root: &Root, rules: &IgnoreRules) -> Result<Snapshot, WatchError> {
    let mut snapshot = Snapshot::new();

    // Roots are followed when they are links; entries below are not
    let metadata = match fs::metadata(&root.path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(WatchError::WatchedFileDeleted {
                path: root.path.clone(),
            })
        }
        Err(source) => {
            return Err(WatchError::Listing {
                path: root.path.clone(),
                source,
            })
        }
    };

    if rules.is_excluded(&root.path) {
        return Ok(snapshot);
    }
    let record = FileRecord::from_metadata(&root.path, &metadata);
    if rules.check_hooks(&root.path, &record)? == Verdict::Skip {
        return Ok(snapshot);
    }
    let is_dir = record.is_dir;
    snapshot.insert(record);

    if !is_dir {
        return Ok(snapshot);
    }

    let mut walker = WalkDir::new(&root.path)
        .min_depth(1)
        .follow_root_links(true)
        .follow_links(false);
    if !root.recursive {
        walker = walker.max_depth(1);
    }

    let mut entries = walker.into_iter();
    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                // Removed between the directory read and the stat
                if is_not_found(err.io_error()) {
                    continue;
                }
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.path.clone());
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "filesystem loop"));
                return Err(WatchError::Listing { path, source });
            }
        };

        let path = entry.path();
        if rules.is_excluded(path) {
            if entry.file_type().is_dir() {
                entries.skip_current_dir();
            }
            trace!("Excluded {}", path.display());
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) if is_not_found(err.io_error()) => continue,
            Err(err) => {
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "metadata unavailable"));
                return Err(WatchError::Listing {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let record = FileRecord::from_metadata(path, &metadata);
        match rules.check_hooks(path, &record)? {
            Verdict::Include => {
                snapshot.insert(record);
            }
            Verdict::Skip => {
                if record.is_dir {
                    entries.skip_current_dir();
                }
                trace!("Filtered {}", path.display());
            }
        }
    }

    Ok(snapshot)
}

fn is_not_found(err: Option<&io::Error>) -> bool {
    err.is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}
