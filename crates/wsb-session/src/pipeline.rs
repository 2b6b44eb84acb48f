//! The per-event pipeline between the watch backend and the UI.
//!
//! ```text
//! RawEvent (absolute) ──► to_relative ──► echo check ──► visibility ──► ChangeEvent
//!                          │ outside root   │ own write     │ collapsed
//!                          ▼                ▼               ▼
//!                        dropped          dropped         dropped
//! ```
//!
//! A removal reported without a file type (the `From` half of a rename) is
//! upgraded to `dirRemoved` when the path is a directory the session knows:
//! one that is expanded, or one a listing or local write has shown to be a
//! directory.

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use wsb_core::{ChangeEvent, ChangeKind, PathResolver};
use wsb_watcher::{RawEvent, VisibilityFilter};

use crate::echo::EchoSuppressor;

/// The session state the dispatch loop reads.
///
/// Locks are held only for synchronous lookups, never across an `.await`.
#[derive(Debug, Default)]
pub struct EventPipeline {
    pub(crate) resolver: RwLock<PathResolver>,
    pub(crate) visibility: RwLock<VisibilityFilter>,
    pub(crate) echo: EchoSuppressor,
    pub(crate) directories: RwLock<FxHashSet<Utf8PathBuf>>,
}

impl EventPipeline {
    /// Creates a pipeline with no workspace root.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one raw event through the pipeline.
    ///
    /// Returns the event to emit, or `None` if it was dropped.
    pub async fn process(&self, raw: RawEvent) -> Option<ChangeEvent> {
        let relative = self.relative(&raw)?;

        if self
            .echo
            .should_suppress(&relative, &raw.path, raw.kind)
            .await
        {
            tracing::debug!(path = %relative, "Suppressed echo of local write");
            return None;
        }

        let kind = self.refine_kind(raw.kind, &relative);

        if !self.visibility.read().is_visible(&relative) {
            tracing::trace!(path = %relative, "Dropped event outside the expanded tree");
            return None;
        }

        Some(ChangeEvent::new(kind, relative))
    }

    /// Records that `relative` is a directory.
    pub fn remember_directory(&self, relative: impl Into<Utf8PathBuf>) {
        self.directories.write().insert(relative.into());
    }

    /// Forgets `relative` and every known directory below it.
    pub fn forget_directory(&self, relative: &Utf8Path) {
        self.directories
            .write()
            .retain(|dir| !dir.starts_with(relative));
    }

    /// Forgets every known directory.
    pub fn forget_directories(&self) {
        self.directories.write().clear();
    }

    /// Returns `true` if `relative` is expanded or known to be a directory.
    #[must_use]
    pub fn is_known_directory(&self, relative: &Utf8Path) -> bool {
        let expanded = self.visibility.read().is_expanded(relative);
        expanded || self.directories.read().contains(relative)
    }

    fn refine_kind(&self, kind: ChangeKind, relative: &Utf8Path) -> ChangeKind {
        match kind {
            ChangeKind::Removed if self.is_known_directory(relative) => {
                self.forget_directory(relative);
                ChangeKind::DirRemoved
            }
            ChangeKind::DirRemoved => {
                self.forget_directory(relative);
                kind
            }
            ChangeKind::DirCreated => {
                self.remember_directory(relative);
                kind
            }
            other => other,
        }
    }

    fn relative(&self, raw: &RawEvent) -> Option<Utf8PathBuf> {
        match self.resolver.read().to_relative(&raw.path) {
            Ok(relative) => Some(relative),
            Err(error) => {
                // Stragglers from a previous root land here.
                tracing::trace!(path = %raw.path, error = %error, "Dropped event outside the workspace");
                None
            }
        }
    }
}
