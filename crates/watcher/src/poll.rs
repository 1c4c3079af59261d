//! Poll loop and lifecycle signalling

use crate::error::WatchError;
use crate::scan::{self, ScanOutcome};
use crate::watcher::{State, Watcher};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use pollwatch_core::{diff, Event};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scans attempted without the lock before scanning under it
const UNLOCKED_SCAN_ATTEMPTS: usize = 2;

/// Watcher lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Configurable, not yet polling
    Created,
    /// Poll loop running
    Started,
    /// Terminal
    Closed,
}

/// One-shot broadcast signal
///
/// Nothing is ever sent; tripping drops the sender so every receiver
/// (current or cloned later) observes the disconnection.
pub(crate) struct Latch {
    tx: Mutex<Option<Sender<()>>>,
    rx: Receiver<()>,
}

impl Latch {
    pub(crate) fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Release all waiters; later calls do nothing
    pub(crate) fn trip(&self) {
        self.tx.lock().take();
    }

    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    /// Block until tripped
    pub(crate) fn wait(&self) {
        let _ = self.rx.recv();
    }
}

/// Signals shared between the poll loop and the facade
pub(crate) struct Signals {
    /// Tripped by `close` to stop the loop and abandon deliveries
    pub(crate) shutdown: Latch,
    /// Tripped once the first snapshot has been captured (or on close)
    pub(crate) ready: Latch,
    /// Tripped once the loop has fully stopped
    pub(crate) closed: Latch,
}

impl Signals {
    pub(crate) fn new() -> Self {
        Self {
            shutdown: Latch::new(),
            ready: Latch::new(),
            closed: Latch::new(),
        }
    }
}

impl Watcher {
    /// Run the poll loop on the calling thread
    ///
    /// The first tick happens immediately, then one per `interval`. Returns
    /// once [`close`](Watcher::close) has been called and the in-flight tick
    /// has finished.
    pub fn start(&self, interval: Duration) -> Result<(), WatchError> {
        if interval.is_zero() {
            return Err(WatchError::DurationTooShort);
        }

        {
            let mut state = self.state.lock();
            match state.lifecycle {
                Lifecycle::Created => state.lifecycle = Lifecycle::Started,
                Lifecycle::Started => return Err(WatchError::AlreadyRunning),
                Lifecycle::Closed => return Err(WatchError::Closed),
            }
        }

        info!("Starting poll loop (interval: {:?})", interval);

        let ticker = tick(interval);
        let shutdown = self.signals.shutdown.receiver();

        if self.tick() {
            loop {
                select! {
                    recv(ticker) -> _ => {
                        if !self.tick() {
                            break;
                        }
                    }
                    recv(shutdown) -> _ => break,
                }
            }
        }

        self.signals.ready.trip();
        self.signals.closed.trip();
        info!("Poll loop stopped");
        Ok(())
    }

    /// Run one tick: scan, diff, filter, deliver
    ///
    /// Returns false once the watcher has been closed.
    pub(crate) fn tick(&self) -> bool {
        let Some((events, errors)) = self.poll_once() else {
            return false;
        };

        for error in errors {
            if !self.deliver(&self.error_tx, error) {
                return false;
            }
        }
        for event in events {
            if !self.deliver(&self.event_tx, event) {
                return false;
            }
        }
        true
    }

    /// Build a snapshot and swap it in, returning what to deliver
    ///
    /// The scan normally runs without the lock held. If the configuration
    /// changed meanwhile the result is discarded and the scan repeated; once
    /// the unlocked attempts are used up the scan runs under the lock, so a
    /// busy mutator cannot starve the loop.
    fn poll_once(&self) -> Option<(Vec<Event>, Vec<WatchError>)> {
        for _ in 0..UNLOCKED_SCAN_ATTEMPTS {
            let (roots, rules, generation) = {
                let state = self.state.lock();
                if state.lifecycle == Lifecycle::Closed {
                    return None;
                }
                (state.roots(), state.rules.clone(), state.generation)
            };

            let outcome = scan::scan(&roots, &rules);

            let state = self.state.lock();
            if state.lifecycle == Lifecycle::Closed {
                return None;
            }
            if state.generation != generation {
                debug!("Configuration changed during scan, rescanning");
                continue;
            }
            return Some(self.commit(state, outcome));
        }

        debug!("Configuration keeps changing, scanning under the lock");
        let state = self.state.lock();
        if state.lifecycle == Lifecycle::Closed {
            return None;
        }
        let outcome = scan::scan(&state.roots(), &state.rules);
        Some(self.commit(state, outcome))
    }

    /// Swap in a scan result that matches the current configuration
    fn commit(
        &self,
        mut state: MutexGuard<'_, State>,
        outcome: Result<ScanOutcome, WatchError>,
    ) -> (Vec<Event>, Vec<WatchError>) {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Scan failed, keeping previous snapshot: {}", err);
                return (Vec::new(), vec![err]);
            }
        };

        let mut errors = Vec::new();
        for path in outcome.vanished {
            warn!("Watched path deleted: {}", path.display());
            state.roots.remove(&path);
            errors.push(WatchError::WatchedFileDeleted { path });
        }

        let events = diff(&state.snapshot, &outcome.snapshot);
        state.snapshot = outcome.snapshot;

        let produced = events.len();
        let events = state.filter.apply(events);
        if produced > 0 {
            debug!("Tick produced {} events, delivering {}", produced, events.len());
        }
        drop(state);

        self.signals.ready.trip();
        (events, errors)
    }

    /// Send on a channel unless the watcher shuts down first
    pub(crate) fn deliver<T>(&self, tx: &Sender<T>, value: T) -> bool {
        select! {
            send(tx, value) -> res => res.is_ok(),
            recv(self.signals.shutdown.receiver()) -> _ => false,
        }
    }
}
