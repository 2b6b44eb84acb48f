//! Workspace sessions for the wsbridge file bridge.
//!
//! A [`WorkspaceSession`] ties together everything one open workspace needs:
//!
//! - a [`PathResolver`](wsb_core::PathResolver) for the workspace root,
//! - a [`WatcherRegistry`](wsb_watcher::WatcherRegistry) reconciled against
//!   the directories the UI has expanded,
//! - an [`EchoSuppressor`] that hides the echoes of the UI's own writes,
//! - a dispatch task that turns raw watch events into [`Notification`]s on a
//!   [`NotificationStream`].
//!
//! It also exposes the workspace-relative file operations the UI uses to
//! browse and edit files.
//!
//! # Crate Dependencies
//!
//! ```text
//! wsb-cli ──► wsb-session ──► wsb-watcher ──► wsb-core
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use camino::Utf8Path;
//! use wsb_core::Config;
//! use wsb_session::{Notification, WorkspaceSession, WriteOptions};
//!
//! # async fn example() -> Result<(), wsb_session::SessionError> {
//! let (session, mut notifications) = WorkspaceSession::new(&Config::default())?;
//! session.set_working_directory(Utf8Path::new("/home/me/project")).await?;
//! session.set_expanded_paths(["src"]).await?;
//!
//! // Not echoed back as a change.
//! session.write_file("src/main.rs", "fn main() {}\n", WriteOptions::default()).await?;
//!
//! while let Some(notification) = notifications.recv().await {
//!     if let Notification::Change(change) = notification {
//!         println!("{} {}", change.kind, change.path);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod echo;
pub mod emitter;
pub mod error;
pub mod fs;
pub mod pipeline;
pub mod session;

pub use echo::EchoSuppressor;
pub use emitter::{ChangeEmitter, FatalReason, FatalWatchError, Notification, NotificationStream};
pub use error::SessionError;
pub use fs::{FileContent, ReadEncoding, ReadOptions, WriteOptions};
pub use pipeline::EventPipeline;
pub use session::WorkspaceSession;

// Re-exported so custom backends need only this crate.
pub use wsb_watcher::{
    NotifyBackend, RawEvent, ReconcileOutcome, WatchBackend, WatchError, WatchSignal,
};
