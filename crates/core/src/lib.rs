//! Core data model for pollwatch
//!
//! This crate provides:
//! - File metadata records captured at a poll tick
//! - Path-ordered snapshots of a watched tree
//! - Change events and their operation kinds
//! - Snapshot diffing with rename/move pairing

pub mod diff;
pub mod event;
pub mod record;
pub mod snapshot;

// Re-exports
pub use diff::diff;
pub use event::{Event, Op, ParseOpError};
pub use record::{FileId, FileRecord};
pub use snapshot::Snapshot;
