//! Workspace-relative change events delivered to the UI.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use super::kind::ChangeKind;

/// A normalized change notification.
///
/// `path` is workspace-relative and POSIX-style.
///
/// # Examples
///
/// ```
/// use wsb_core::{ChangeEvent, ChangeKind};
///
/// let event = ChangeEvent::new(ChangeKind::Created, "src/x.txt");
/// assert_eq!(event.path.as_str(), "src/x.txt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,

    /// The affected entry, relative to the workspace root.
    pub path: Utf8PathBuf,
}

impl ChangeEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(kind: ChangeKind, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}
