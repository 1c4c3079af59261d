//! Snapshot diffing
//!
//! Listings carry no stable cross-platform identity, so renames and moves are
//! recovered heuristically: a vanished path and a new path holding an entry of
//! the same kind, size and mode are treated as the same entry. Two files
//! renamed in the same tick with indistinguishable metadata may be paired
//! crosswise; that ambiguity is inherent to polling.

use crate::event::{Event, Op};
use crate::record::FileRecord;
use crate::snapshot::Snapshot;
use std::path::Path;

/// Compute the events that turn `old` into `new`
///
/// Events are ordered by path (the new path for renames and moves).
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<Event> {
    let mut events = Vec::new();
    let mut creates: Vec<&FileRecord> = Vec::new();
    let mut removes: Vec<&FileRecord> = Vec::new();

    for (path, record) in new {
        match old.get(path) {
            None => creates.push(record),
            Some(previous) => {
                if let Some(op) = classify_change(previous, record) {
                    events.push(Event::new(op, record.clone()));
                }
            }
        }
    }

    for (path, record) in old {
        if !new.contains(path) {
            removes.push(record);
        }
    }

    // Pair removals with creations. Both lists are already path-ordered.
    let mut paired = vec![false; creates.len()];
    for removed in removes {
        let candidate = creates
            .iter()
            .enumerate()
            .filter(|(i, created)| !paired[*i] && removed.same_entry(created))
            .map(|(i, created)| (edit_distance(&removed.path, &created.path), &created.path, i))
            .min()
            .map(|(_, _, i)| i);

        match candidate {
            Some(i) => {
                paired[i] = true;
                events.push(Event::relocated(removed.path.clone(), creates[i].clone()));
            }
            None => events.push(Event::new(Op::Remove, removed.clone())),
        }
    }

    for (i, created) in creates.into_iter().enumerate() {
        if !paired[i] {
            events.push(Event::new(Op::Create, created.clone()));
        }
    }

    // Stable sort keeps the per-path order deterministic
    events.sort_by(|a, b| a.path.cmp(&b.path));
    events
}

/// Classify a path present in both snapshots
fn classify_change(old: &FileRecord, new: &FileRecord) -> Option<Op> {
    if old.modified != new.modified || old.size != new.size {
        Some(Op::Write)
    } else if old.mode != new.mode {
        Some(Op::Chmod)
    } else {
        None
    }
}

/// Levenshtein distance between two paths, by character
fn edit_distance(a: &Path, b: &Path) -> usize {
    let a: Vec<char> = a.to_string_lossy().chars().collect();
    let b: Vec<char> = b.to_string_lossy().chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
