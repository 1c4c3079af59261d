//! File metadata captured at a single poll tick

use serde::{Deserialize, Serialize};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Platform file identity (device + inode)
///
/// Only available on Unix. Used as a hint when pairing renames; records
/// without one fall back to metadata comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId {
    pub device: u64,
    pub inode: u64,
}

/// Immutable metadata of one path at one poll tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path
    pub path: PathBuf,
    /// Final path component
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Mode bits (Unix `st_mode`, synthesized elsewhere)
    pub mode: u32,
    /// Modification time
    pub modified: SystemTime,
    /// Whether the path is a directory
    pub is_dir: bool,
    /// Device/inode pair when the platform exposes one
    #[serde(default)]
    pub file_id: Option<FileId>,
}

impl FileRecord {
    /// Capture a record from filesystem metadata
    ///
    /// The metadata should come from `symlink_metadata` so links are
    /// recorded rather than followed.
    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Self {
        Self {
            path: path.to_path_buf(),
            name: file_name(path),
            size: metadata.len(),
            mode: mode_bits(metadata),
            modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            is_dir: metadata.is_dir(),
            file_id: file_id(metadata),
        }
    }

    /// Create a synthetic file record (no filesystem access)
    pub fn file(path: impl Into<PathBuf>, size: u64, mode: u32, modified: SystemTime) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            size,
            mode,
            modified,
            is_dir: false,
            file_id: None,
        }
    }

    /// Create a synthetic directory record (no filesystem access)
    pub fn dir(path: impl Into<PathBuf>, mode: u32, modified: SystemTime) -> Self {
        Self {
            is_dir: true,
            ..Self::file(path, 0, mode, modified)
        }
    }

    /// Size, mode and modification time all agree
    pub fn metadata_eq(&self, other: &FileRecord) -> bool {
        self.size == other.size && self.mode == other.mode && self.modified == other.modified
    }

    /// Whether `other` could be this entry after a rename or move
    ///
    /// Size, mode and kind must match. When both sides carry a platform
    /// identity it must match too.
    pub fn same_entry(&self, other: &FileRecord) -> bool {
        if self.is_dir != other.is_dir || self.size != other.size || self.mode != other.mode {
            return false;
        }
        match (self.file_id, other.file_id) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }

    /// Parent directory of this record's path
    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    let base = if metadata.permissions().readonly() { 0o444 } else { 0o666 };
    if metadata.is_dir() {
        base | 0o040111
    } else {
        base | 0o100000
    }
}

#[cfg(unix)]
fn file_id(metadata: &Metadata) -> Option<FileId> {
    use std::os::unix::fs::MetadataExt;
    Some(FileId {
        device: metadata.dev(),
        inode: metadata.ino(),
    })
}

#[cfg(not(unix))]
fn file_id(_metadata: &Metadata) -> Option<FileId> {
    None
}
