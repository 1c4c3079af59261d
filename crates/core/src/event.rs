//! Change events emitted by the watcher

use crate::record::FileRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Kind of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Op {
    /// Path appeared
    Create,
    /// Content changed (modification time or size)
    Write,
    /// Path disappeared
    Remove,
    /// Path renamed within the same directory
    Rename,
    /// Path moved to a different directory
    Move,
    /// Only the mode bits changed
    Chmod,
}

impl Op {
    /// All operation kinds
    pub const ALL: [Op; 6] = [
        Op::Create,
        Op::Write,
        Op::Remove,
        Op::Rename,
        Op::Move,
        Op::Chmod,
    ];

    /// Upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Create => "CREATE",
            Op::Write => "WRITE",
            Op::Remove => "REMOVE",
            Op::Rename => "RENAME",
            Op::Move => "MOVE",
            Op::Chmod => "CHMOD",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown operation name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOpError(String);

impl fmt::Display for ParseOpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown operation '{}' (expected one of create, write, remove, rename, move, chmod)",
            self.0
        )
    }
}

impl std::error::Error for ParseOpError {}

impl FromStr for Op {
    type Err = ParseOpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Op::ALL
            .iter()
            .copied()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseOpError(s.to_string()))
    }
}

/// A single change to a watched path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Kind of change
    pub op: Op,
    /// Path affected (the new path for renames and moves)
    pub path: PathBuf,
    /// Previous path (renames and moves only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub old_path: Option<PathBuf>,
    /// Metadata of the path; the last known record for removals
    pub record: Option<FileRecord>,
}

impl Event {
    /// Create an event for a single path
    pub fn new(op: Op, record: FileRecord) -> Self {
        Self {
            op,
            path: record.path.clone(),
            old_path: None,
            record: Some(record),
        }
    }

    /// Create a rename or move event from the old path to `record`
    pub fn relocated(old_path: PathBuf, record: FileRecord) -> Self {
        let op = if old_path.parent() == record.path.parent() {
            Op::Rename
        } else {
            Op::Move
        };
        Self {
            op,
            path: record.path.clone(),
            old_path: Some(old_path),
            record: Some(record),
        }
    }

    /// Whether the event refers to a directory
    pub fn is_dir(&self) -> bool {
        self.record.as_ref().is_some_and(|r| r.is_dir)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(record) = &self.record else {
            return f.write_str("???");
        };

        let kind = if record.is_dir { "DIRECTORY" } else { "FILE" };
        write!(f, "{} {:?} {} [", kind, record.name, self.op)?;
        if let Some(old_path) = &self.old_path {
            write!(f, "{} -> ", old_path.display())?;
        }
        write!(f, "{}]", self.path.display())
    }
}
