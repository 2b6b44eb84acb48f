//! Raw watch events and their translation from `notify`.
//!
//! # Event Flow
//!
//! ```text
//! OS watch (inotify / FSEvents / ReadDirectoryChangesW)
//!        │
//!        ▼
//!   notify::Event ──► translate() ──► RawEvent (absolute path)
//!        │
//!        ▼
//!   WatchSignal sent via channel to the session dispatch loop
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use notify::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use smallvec::SmallVec;
use wsb_core::ChangeKind;

use crate::error::WatchError;

/// A change reported by the backend, before path translation and filtering.
///
/// Removals that arrive as the `From` half of a rename carry no file type,
/// so a moved-away directory shows up here as [`ChangeKind::Removed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// The normalized kind of change.
    pub kind: ChangeKind,

    /// The absolute path of the affected entry.
    pub path: Utf8PathBuf,
}

impl RawEvent {
    /// Creates a new raw event.
    #[inline]
    #[must_use]
    pub fn new(kind: ChangeKind, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// A message from the backend to the session.
#[derive(Debug)]
pub enum WatchSignal {
    /// A filesystem change.
    Event(RawEvent),

    /// The backend reported an error while running.
    ///
    /// `paths` names the watched directories the error applies to, if the
    /// backend knows them.
    Error {
        /// Affected watched directories.
        paths: SmallVec<[Utf8PathBuf; 2]>,
        /// The underlying error.
        error: WatchError,
    },
}

impl WatchSignal {
    /// Wraps a runtime `notify` error, keeping its UTF-8 paths.
    #[must_use]
    pub fn from_notify_error(mut error: notify::Error) -> Self {
        let paths = std::mem::take(&mut error.paths)
            .into_iter()
            .filter_map(|path| Utf8PathBuf::from_path_buf(path).ok())
            .collect();

        Self::Error {
            paths,
            error: WatchError::Notify(error),
        }
    }
}

/// Translates a `notify` event into zero or more raw events.
///
/// Access and metadata-only events are dropped. Renames are reported through
/// their `From`/`To` halves, so the paired `Both` event is dropped to avoid
/// announcing the same rename twice. Paths that are not valid UTF-8 are
/// logged and skipped.
#[must_use]
pub fn translate(event: notify::Event) -> SmallVec<[RawEvent; 2]> {
    let kind = event.kind;
    let mut out = SmallVec::new();

    for path in event.paths {
        let path = match Utf8PathBuf::try_from(path) {
            Ok(p) => p,
            Err(e) => {
                let invalid_path = e.into_path_buf();
                tracing::warn!(
                    path = %invalid_path.display(),
                    "Skipping non-UTF-8 path in watch event"
                );
                continue;
            }
        };

        if let Some(change) = classify(kind, &path) {
            out.push(RawEvent::new(change, path));
        }
    }

    out
}

fn classify(kind: EventKind, path: &Utf8Path) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(CreateKind::Folder) => Some(ChangeKind::DirCreated),
        EventKind::Create(CreateKind::File) => Some(ChangeKind::Created),
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            Some(ChangeKind::created(path.is_dir()))
        }
        EventKind::Remove(RemoveKind::Folder) => Some(ChangeKind::DirRemoved),
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            Some(ChangeKind::Removed)
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both))
        | EventKind::Modify(ModifyKind::Metadata(_))
        | EventKind::Access(_)
        | EventKind::Any
        | EventKind::Other => None,
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(_) => Some(ChangeKind::Changed),
    }
}
