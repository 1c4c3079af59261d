//! Polling file system watcher for Pollwatch
//!
//! This crate detects changes by comparing periodic snapshots:
//! - Files, directories and recursive trees as watch roots
//! - Ignore list, hidden-file exclusion and filter hooks
//! - Rename and move detection by pairing removals with creations
//! - Per-tick operation filter and rate cap
//! - Thread-safe lifecycle (start, wait, close) over crossbeam channels

pub mod config;
pub mod error;
pub mod ops;
pub mod poll;
pub mod rules;
pub mod scan;
pub mod watcher;

pub use config::WatchConfig;
pub use error::WatchError;
pub use ops::OpFilter;
pub use poll::Lifecycle;
pub use pollwatch_core::{Event, FileId, FileRecord, Op, ParseOpError, Snapshot};
pub use rules::{is_hidden, FilterHook, GitignoreHook, IgnoreRules, RegexFilterHook, Verdict};
pub use scan::{scan, scan_root, Root, ScanOutcome};
pub use watcher::Watcher;
