//! OS watch backends.
//!
//! The [`WatchBackend`] trait is the seam between the registry's bookkeeping
//! and the operating system. [`NotifyBackend`] is the production
//! implementation on top of `notify`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    notify thread (inotify / FSEvents / ...)     │
//! │  ┌───────────────────┐    ┌──────────────┐    ┌─────────────┐  │
//! │  │ RecommendedWatcher│ -> │ translate()  │ -> │ IgnoreFilter│  │
//! │  │ (one per session) │    │ (RawEvent)   │    │ (at source) │  │
//! │  └───────────────────┘    └──────────────┘    └──────┬──────┘  │
//! └──────────────────────────────────────────────────────│─────────┘
//!                                                        │
//!                                          blocking_send │
//!                                                        ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Async Runtime (tokio)                        │
//! │          mpsc::Receiver<WatchSignal> -> session dispatch loop   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! One `RecommendedWatcher` serves the whole session; each directory handle
//! is a separate non-recursive `watch` call on it. This keeps the number of
//! inotify instances at one per session no matter how many directories the
//! UI expands.

use camino::Utf8Path;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;
use crate::events::{WatchSignal, translate};
use crate::filter::FileFilter;

/// Opens and closes non-recursive directory watches.
///
/// Implementations deliver events out of band (for [`NotifyBackend`], through
/// the channel passed at construction). Both methods are expected to return
/// promptly.
pub trait WatchBackend: Send + 'static {
    /// Starts watching the direct children of `dir`.
    fn watch(&mut self, dir: &Utf8Path) -> Result<(), WatchError>;

    /// Stops watching `dir`.
    fn unwatch(&mut self, dir: &Utf8Path) -> Result<(), WatchError>;
}

/// A [`WatchBackend`] backed by the platform's recommended `notify` watcher.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend").finish_non_exhaustive()
    }
}

impl NotifyBackend {
    /// Creates the backend.
    ///
    /// Events that pass `filter` are sent on `event_tx` from the notify
    /// thread with `blocking_send`, so a full channel blocks the notify thread
    /// until the dispatch loop catches up.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the platform watcher cannot be
    /// created (for example when the inotify instance limit is reached).
    pub fn new<F: FileFilter>(
        event_tx: mpsc::Sender<WatchSignal>,
        filter: F,
    ) -> Result<Self, WatchError> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            forward(res, &event_tx, &filter);
        })?;

        Ok(Self { watcher })
    }
}

impl WatchBackend for NotifyBackend {
    fn watch(&mut self, dir: &Utf8Path) -> Result<(), WatchError> {
        if !dir.is_dir() {
            return Err(WatchError::path_not_found(dir));
        }
        self.watcher
            .watch(dir.as_std_path(), RecursiveMode::NonRecursive)?;
        tracing::debug!(path = %dir, "Directory watch opened");
        Ok(())
    }

    fn unwatch(&mut self, dir: &Utf8Path) -> Result<(), WatchError> {
        self.watcher.unwatch(dir.as_std_path())?;
        tracing::debug!(path = %dir, "Directory watch closed");
        Ok(())
    }
}

/// Runs on the notify thread for every event or error.
fn forward<F: FileFilter>(
    res: notify::Result<notify::Event>,
    tx: &mpsc::Sender<WatchSignal>,
    filter: &F,
) {
    match res {
        Ok(event) => {
            for raw in translate(event) {
                if !filter.should_process(&raw.path) {
                    tracing::trace!(path = %raw.path, "Filtered out watch event");
                    continue;
                }

                if tx.blocking_send(WatchSignal::Event(raw)).is_err() {
                    tracing::debug!("Event channel closed, dropping watch event");
                    return;
                }
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "Watch backend error");
            if tx
                .blocking_send(WatchSignal::from_notify_error(error))
                .is_err()
            {
                tracing::debug!("Event channel closed, dropping watch error");
            }
        }
    }
}
