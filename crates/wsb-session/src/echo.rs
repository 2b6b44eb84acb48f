//! Suppression of change events caused by the session's own writes.
//!
//! When the UI writes a file, the OS reports a change for it a moment later.
//! Forwarding that change would make the editor reload content it already
//! has. The suppressor remembers the bytes of the most recent local write per
//! path and swallows a `changed` event when the file on disk still holds
//! exactly those bytes.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use wsb_core::ChangeKind;

/// Pending local writes keyed by workspace-relative path.
///
/// Entries never expire. Each local write replaces the previous entry for
/// its path, and [`clear`](Self::clear) drops everything when the workspace
/// is reset or closed.
#[derive(Debug, Default)]
pub struct EchoSuppressor {
    pending: Mutex<FxHashMap<Utf8PathBuf, Arc<[u8]>>>,
}

impl EchoSuppressor {
    /// Creates an empty suppressor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers `content` as the latest local write to `relative`.
    pub fn record_local_write(&self, relative: &Utf8Path, content: &[u8]) {
        self.pending
            .lock()
            .insert(relative.to_owned(), Arc::from(content));
    }

    /// Decides whether a change event is an echo of a local write.
    ///
    /// Only [`ChangeKind::Changed`] events are ever suppressed. The file at
    /// `absolute` is re-read; if it cannot be read, the event is not
    /// suppressed.
    pub async fn should_suppress(
        &self,
        relative: &Utf8Path,
        absolute: &Utf8Path,
        kind: ChangeKind,
    ) -> bool {
        if kind != ChangeKind::Changed {
            return false;
        }

        let expected = {
            let pending = self.pending.lock();
            match pending.get(relative) {
                Some(content) => Arc::clone(content),
                None => return false,
            }
        };

        match tokio::fs::read(absolute).await {
            Ok(actual) => {
                let echo = actual.as_slice() == &*expected;
                tracing::trace!(path = %relative, echo, "Compared change against local write");
                echo
            }
            Err(error) => {
                tracing::debug!(path = %absolute, error = %error, "Could not re-read changed file");
                false
            }
        }
    }

    /// Returns `true` if a local write is remembered for `relative`.
    #[must_use]
    pub fn is_pending(&self, relative: &Utf8Path) -> bool {
        self.pending.lock().contains_key(relative)
    }

    /// Number of remembered writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Returns `true` if nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Forgets every remembered write.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}
