//! Error types for the wsb-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while opening, closing, or running directory watches.

use camino::Utf8PathBuf;

/// `EMFILE`: the process ran out of file descriptors.
#[cfg(unix)]
const EMFILE: i32 = 24;

/// Errors that can occur during directory watching.
///
/// # Error Recovery Strategy
///
/// A failed watch leaves its directory unwatched and the session keeps
/// running. The one exception is resource exhaustion (the OS watch limit or
/// the file descriptor limit), which [`is_fatal`](Self::is_fatal) reports so
/// that the consumer can tell the user.
///
/// # Examples
///
/// ```
/// use wsb_watcher::WatchError;
///
/// let err = WatchError::Notify(notify::Error::new(notify::ErrorKind::MaxFilesWatch));
/// assert!(err.is_resource_exhaustion());
/// assert!(err.is_fatal());
///
/// let err = WatchError::path_not_found("/ws/missing");
/// assert!(!err.is_fatal());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend failed.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The directory to watch does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns `true` if the OS refused the watch because a watch or file
    /// descriptor limit was reached.
    #[must_use]
    pub fn is_resource_exhaustion(&self) -> bool {
        match self {
            Self::Notify(error) => match &error.kind {
                notify::ErrorKind::MaxFilesWatch => true,
                notify::ErrorKind::Io(io) => io_is_exhaustion(io),
                notify::ErrorKind::Generic(message) => message.contains("ENOSPC"),
                _ => false,
            },
            Self::PathNotFound(_) => false,
        }
    }

    /// Returns `true` if this error must be surfaced to the user.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.is_resource_exhaustion()
    }
}

fn io_is_exhaustion(error: &std::io::Error) -> bool {
    if error.kind() == std::io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    {
        error.raw_os_error() == Some(EMFILE)
    }

    #[cfg(not(unix))]
    {
        false
    }
}
