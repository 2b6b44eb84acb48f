//! Error types for the wsb-session crate.

use camino::Utf8PathBuf;
use wsb_core::PathError;
use wsb_watcher::WatchError;

/// Errors returned by [`WorkspaceSession`](crate::WorkspaceSession)
/// operations.
///
/// I/O failures carry the name of the operation and the path it was applied
/// to. Nothing is retried.
///
/// # Examples
///
/// ```
/// use wsb_session::SessionError;
///
/// let error = SessionError::io(
///     "read file",
///     "src/missing.rs",
///     std::io::Error::from(std::io::ErrorKind::NotFound),
/// );
/// assert!(error.to_string().starts_with("failed to read file 'src/missing.rs'"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No workspace root has been set.
    #[error("workspace root is not set")]
    NotConfigured,

    /// A path could not be resolved against the workspace root.
    #[error(transparent)]
    Path(PathError),

    /// A filesystem operation failed.
    #[error("failed to {op} '{path}': {source}")]
    Io {
        /// The operation that failed.
        op: &'static str,
        /// The path as given by the caller.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The workspace root must be a directory.
    #[error("not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// The watch backend failed.
    #[error(transparent)]
    Watch(#[from] WatchError),
}

impl SessionError {
    /// Creates a new [`SessionError::Io`] error.
    #[inline]
    pub fn io(op: &'static str, path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this is [`SessionError::NotConfigured`].
    #[inline]
    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }

    /// Returns the underlying I/O error kind, if this is an I/O failure.
    #[must_use]
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

impl From<PathError> for SessionError {
    fn from(error: PathError) -> Self {
        match error {
            PathError::NotConfigured => Self::NotConfigured,
            other => Self::Path(other),
        }
    }
}
