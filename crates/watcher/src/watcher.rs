//! Public watcher facade

use crate::config::WatchConfig;
use crate::error::WatchError;
use crate::ops::OpFilter;
use crate::poll::{Lifecycle, Signals};
use crate::rules::{FilterHook, IgnoreRules};
use crate::scan::{self, Root};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use pollwatch_core::{Event, FileRecord, Op, Snapshot};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration and snapshot, guarded together
pub(crate) struct State {
    pub(crate) lifecycle: Lifecycle,
    /// Watched roots and whether each is recursive
    pub(crate) roots: BTreeMap<PathBuf, bool>,
    pub(crate) rules: IgnoreRules,
    pub(crate) filter: OpFilter,
    /// Last committed snapshot
    pub(crate) snapshot: Snapshot,
    /// Bumped whenever anything that affects scanning changes
    pub(crate) generation: u64,
}

impl State {
    pub(crate) fn roots(&self) -> Vec<Root> {
        self.roots
            .iter()
            .map(|(path, recursive)| Root::new(path, *recursive))
            .collect()
    }

    fn ensure_open(&self) -> Result<(), WatchError> {
        if self.lifecycle == Lifecycle::Closed {
            Err(WatchError::Closed)
        } else {
            Ok(())
        }
    }

    fn reconfigured(&mut self) {
        self.generation += 1;
    }
}

/// Polling file system watcher
///
/// Share it behind an `Arc`: one thread runs [`start`](Watcher::start), a
/// consumer reads [`events`](Watcher::events), [`errors`](Watcher::errors)
/// and [`closed`](Watcher::closed), and any thread may reconfigure it or
/// call [`close`](Watcher::close).
pub struct Watcher {
    pub(crate) state: Mutex<State>,
    pub(crate) event_tx: Sender<Event>,
    event_rx: Receiver<Event>,
    pub(crate) error_tx: Sender<WatchError>,
    error_rx: Receiver<WatchError>,
    pub(crate) signals: Signals,
}

impl Watcher {
    /// Create a watcher with the default configuration
    pub fn new() -> Self {
        Self::with_config(WatchConfig::default())
    }

    pub fn with_config(config: WatchConfig) -> Self {
        let (event_tx, event_rx) = bounded(config.event_capacity);
        let (error_tx, error_rx) = bounded(config.error_capacity);

        Self {
            state: Mutex::new(State {
                lifecycle: Lifecycle::Created,
                roots: BTreeMap::new(),
                rules: IgnoreRules::new(config.ignore_hidden),
                filter: OpFilter::new(config.ops.iter().copied(), config.max_events),
                snapshot: Snapshot::new(),
                generation: 0,
            }),
            event_tx,
            event_rx,
            error_tx,
            error_rx,
            signals: Signals::new(),
        }
    }

    /// Watch a file, or a directory and its immediate children
    pub fn add(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        self.add_root(path.as_ref(), false)
    }

    /// Watch a directory and its whole subtree
    pub fn add_recursive(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        self.add_root(path.as_ref(), true)
    }

    fn add_root(&self, path: &Path, recursive: bool) -> Result<(), WatchError> {
        let path = resolve_existing(path)?;

        let mut state = self.state.lock();
        state.ensure_open()?;

        if state.rules.is_excluded(&path) {
            debug!("Not watching excluded path {}", path.display());
            return Ok(());
        }

        let listing = scan::scan_root(&Root::new(&path, recursive), &state.rules).map_err(
            |err| match err {
                WatchError::WatchedFileDeleted { path } => WatchError::NotFound { path },
                err => err,
            },
        )?;

        info!(
            "Watching {} ({} entries, recursive: {})",
            path.display(),
            listing.len(),
            recursive
        );
        state.snapshot.extend(listing);
        state.roots.insert(path, recursive);
        state.reconfigured();
        Ok(())
    }

    /// Stop watching a root added with [`add`](Watcher::add)
    ///
    /// Drops the path and its immediate children from the snapshot.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let path = resolve(path.as_ref())?;

        let mut state = self.state.lock();
        state.ensure_open()?;
        state.roots.remove(&path);
        state.snapshot.remove_children(&path);
        state.reconfigured();
        Ok(())
    }

    /// Stop watching a path and every root below it
    ///
    /// Drops the whole subtree from the snapshot.
    pub fn remove_recursive(&self, path: impl AsRef<Path>) -> Result<(), WatchError> {
        let path = resolve(path.as_ref())?;

        let mut state = self.state.lock();
        state.ensure_open()?;
        state.roots.retain(|root, _| !root.starts_with(&path));
        state.snapshot.remove_subtree(&path);
        state.reconfigured();
        Ok(())
    }

    /// Exclude existing paths (and their subtrees) from now on
    ///
    /// Fails without changing anything if any path does not exist.
    pub fn ignore<I, P>(&self, paths: I) -> Result<(), WatchError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let resolved = paths
            .into_iter()
            .map(|p| resolve_existing(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.state.lock();
        state.ensure_open()?;

        for path in resolved {
            state.roots.retain(|root, _| !root.starts_with(&path));
            let dropped = state.snapshot.remove_subtree(&path);
            debug!("Ignoring {} ({} entries dropped)", path.display(), dropped);
            state.rules.ignore(path);
        }
        state.reconfigured();
        Ok(())
    }

    /// Exclude dot-files and dot-directories from the next scan on
    pub fn ignore_hidden_files(&self, enabled: bool) {
        let mut state = self.state.lock();
        if state.rules.set_ignore_hidden(enabled) {
            state.reconfigured();
        }
    }

    /// Append a filter hook; hooks run in registration order
    pub fn add_filter_hook(&self, hook: impl FilterHook + 'static) {
        let mut state = self.state.lock();
        state.rules.add_hook(Arc::new(hook));
        state.reconfigured();
    }

    /// Deliver only these operation kinds (none = all)
    pub fn filter_ops(&self, ops: impl IntoIterator<Item = Op>) {
        self.state.lock().filter.set_ops(ops);
    }

    /// Deliver at most `max` events per tick (0 = unlimited)
    pub fn set_max_events(&self, max: usize) {
        self.state.lock().filter.set_max_events(max);
    }

    /// Copy of the current snapshot
    pub fn watched_files(&self) -> Snapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lock().lifecycle
    }

    /// Change events
    pub fn events(&self) -> &Receiver<Event> {
        &self.event_rx
    }

    /// Scan failures and deleted roots
    pub fn errors(&self) -> &Receiver<WatchError> {
        &self.error_rx
    }

    /// Disconnects once the watcher has fully stopped
    ///
    /// Nothing is ever received; `recv` returns an error when closed.
    pub fn closed(&self) -> &Receiver<()> {
        self.signals.closed.receiver()
    }

    /// Block until the first snapshot has been captured
    ///
    /// Also returns if the watcher is closed before that.
    pub fn wait(&self) {
        self.signals.ready.wait();
    }

    /// Inject an event directly into the event channel
    ///
    /// The snapshot is not touched. Blocks while the channel is full.
    pub fn trigger_event(&self, op: Op, record: Option<FileRecord>) -> Result<(), WatchError> {
        self.state.lock().ensure_open()?;

        let event = match record {
            Some(record) => Event::new(op, record),
            None => Event {
                op,
                path: PathBuf::new(),
                old_path: None,
                record: None,
            },
        };

        if self.deliver(&self.event_tx, event) {
            Ok(())
        } else {
            Err(WatchError::Closed)
        }
    }

    /// Stop polling and release everything waiting on the watcher
    ///
    /// Safe to call from any thread, during a tick, and more than once.
    pub fn close(&self) {
        let previous = {
            let mut state = self.state.lock();
            let previous = std::mem::replace(&mut state.lifecycle, Lifecycle::Closed);
            if previous != Lifecycle::Closed {
                state.roots.clear();
                state.snapshot = Snapshot::new();
            }
            previous
        };

        match previous {
            Lifecycle::Closed => return,
            Lifecycle::Created => {
                self.signals.shutdown.trip();
                self.signals.ready.trip();
                self.signals.closed.trip();
            }
            // The poll loop trips `closed` once the current tick is done
            Lifecycle::Started => {
                self.signals.shutdown.trip();
                self.signals.ready.trip();
            }
        }
        info!("Watcher closing");
    }
}

impl Default for Watcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Absolute, lexically normalized form of `path`
fn resolve(path: &Path) -> Result<PathBuf, WatchError> {
    let absolute = std::path::absolute(path).map_err(|e| WatchError::resolve(path, e))?;
    Ok(normalize(&absolute))
}

/// Like [`resolve`], but the path must exist
fn resolve_existing(path: &Path) -> Result<PathBuf, WatchError> {
    let path = resolve(path)?;
    fs::symlink_metadata(&path).map_err(|e| WatchError::resolve(&path, e))?;
    Ok(path)
}

/// Drop `.` components and fold `..` into the preceding component
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
