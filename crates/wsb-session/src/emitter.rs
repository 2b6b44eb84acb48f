//! Delivery of notifications to the UI consumer.
//!
//! The session writes [`Notification`]s into a bounded channel through a
//! [`ChangeEmitter`]; the consumer reads them from the matching
//! [`NotificationStream`]. A full channel makes the dispatch loop wait, so a
//! consumer must keep draining the stream.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use wsb_core::ChangeEvent;

/// Why watching had to give up on a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FatalReason {
    /// The OS watch limit or the file descriptor limit was reached.
    ResourceExhausted,
}

/// A watch failure the user has to be told about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatalWatchError {
    /// The affected directory, relative to the workspace root, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub path: Option<Utf8PathBuf>,

    /// The classified cause.
    pub reason: FatalReason,

    /// The backend's error message.
    pub message: String,
}

/// Everything the notification stream carries.
///
/// Serialized with an `event` tag:
///
/// ```
/// use wsb_core::{ChangeEvent, ChangeKind};
/// use wsb_session::Notification;
///
/// let n = Notification::Change(ChangeEvent::new(ChangeKind::Created, "src/x.txt"));
/// assert_eq!(
///     serde_json::to_string(&n).unwrap(),
///     r#"{"event":"change","kind":"created","path":"src/x.txt"}"#,
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum Notification {
    /// A visible entry changed on disk.
    Change(ChangeEvent),

    /// A directory could not be watched because an OS limit was reached.
    WatchFatal(FatalWatchError),

    /// A new workspace root was opened.
    #[serde(rename_all = "camelCase")]
    WorkingDirChanged {
        /// The canonical workspace root.
        path: Utf8PathBuf,
    },
}

/// Creates a connected emitter and stream with room for `capacity`
/// notifications.
#[must_use]
pub fn channel(capacity: usize) -> (ChangeEmitter, NotificationStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChangeEmitter { tx }, NotificationStream { rx })
}

/// The sending half of the notification channel.
#[derive(Debug, Clone)]
pub struct ChangeEmitter {
    tx: mpsc::Sender<Notification>,
}

impl ChangeEmitter {
    /// Delivers a change event.
    pub async fn emit(&self, event: ChangeEvent) {
        tracing::debug!(kind = %event.kind, path = %event.path, "Emitting change");
        self.send(Notification::Change(event)).await;
    }

    /// Delivers a fatal watch error.
    pub async fn fatal(&self, error: FatalWatchError) {
        self.send(Notification::WatchFatal(error)).await;
    }

    /// Announces a new workspace root.
    pub async fn working_dir_changed(&self, root: &Utf8Path) {
        self.send(Notification::WorkingDirChanged {
            path: root.to_owned(),
        })
        .await;
    }

    /// Returns `true` once the stream has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, notification: Notification) {
        if self.tx.send(notification).await.is_err() {
            tracing::debug!("Notification consumer is gone, dropping notification");
        }
    }
}

/// The receiving half of the notification channel.
#[derive(Debug)]
pub struct NotificationStream {
    rx: mpsc::Receiver<Notification>,
}

impl NotificationStream {
    /// Waits for the next notification.
    ///
    /// Returns `None` once the session has shut down and every notification
    /// has been received.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Returns the next notification if one is ready.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}
