//! Directory listing entries and file metadata.

use std::fs::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One entry of a non-recursive directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    /// The entry's file name.
    pub name: String,

    /// Whether the entry is a directory.
    pub is_directory: bool,
}

impl DirEntry {
    /// Creates a new listing entry.
    #[must_use]
    pub fn new(name: impl Into<String>, is_directory: bool) -> Self {
        Self {
            name: name.into(),
            is_directory,
        }
    }
}

/// File metadata returned by `stat` and `lstat`.
///
/// Timestamps are milliseconds since the Unix epoch and are `None` when the
/// platform does not report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStat {
    /// Size in bytes.
    pub size: u64,

    /// Whether the entry is a directory.
    pub is_directory: bool,

    /// Whether the entry is a regular file.
    pub is_file: bool,

    /// Whether the entry is a symbolic link (only ever true for `lstat`).
    pub is_symbolic_link: bool,

    /// Whether the entry is read-only.
    pub readonly: bool,

    /// Last modification time.
    pub modified_ms: Option<u64>,

    /// Last access time.
    pub accessed_ms: Option<u64>,

    /// Creation time.
    pub created_ms: Option<u64>,
}

impl FileStat {
    /// Builds a [`FileStat`] from platform metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        Self {
            size: metadata.len(),
            is_directory: file_type.is_dir(),
            is_file: file_type.is_file(),
            is_symbolic_link: file_type.is_symlink(),
            readonly: metadata.permissions().readonly(),
            modified_ms: metadata.modified().ok().and_then(epoch_millis),
            accessed_ms: metadata.accessed().ok().and_then(epoch_millis),
            created_ms: metadata.created().ok().and_then(epoch_millis),
        }
    }
}

fn epoch_millis(time: SystemTime) -> Option<u64> {
    let elapsed = time.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(elapsed.as_millis()).ok()
}
