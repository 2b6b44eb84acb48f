//! Normalized filesystem change kinds.

use serde::{Deserialize, Serialize};

/// The kind of change reported to the UI.
///
/// Serialized in camelCase (`dirCreated`, `changed`, ...).
///
/// # Examples
///
/// ```
/// use wsb_core::ChangeKind;
///
/// assert_eq!(ChangeKind::DirCreated.label(), "dirCreated");
/// assert!(ChangeKind::DirRemoved.is_directory());
/// assert!(!ChangeKind::Changed.is_directory());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// A file was created.
    Created,
    /// A file was removed.
    Removed,
    /// A directory was created.
    DirCreated,
    /// A directory was removed.
    DirRemoved,
    /// File contents changed.
    Changed,
    /// An entry was renamed.
    Renamed,
}

impl ChangeKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Removed => "removed",
            Self::DirCreated => "dirCreated",
            Self::DirRemoved => "dirRemoved",
            Self::Changed => "changed",
            Self::Renamed => "renamed",
        }
    }

    /// Returns `true` for directory-level kinds.
    #[inline]
    #[must_use]
    pub const fn is_directory(self) -> bool {
        matches!(self, Self::DirCreated | Self::DirRemoved)
    }

    /// Returns the creation kind for a file or directory.
    #[inline]
    #[must_use]
    pub const fn created(is_directory: bool) -> Self {
        if is_directory {
            Self::DirCreated
        } else {
            Self::Created
        }
    }

    /// Returns the removal kind for a file or directory.
    #[inline]
    #[must_use]
    pub const fn removed(is_directory: bool) -> Self {
        if is_directory {
            Self::DirRemoved
        } else {
            Self::Removed
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
