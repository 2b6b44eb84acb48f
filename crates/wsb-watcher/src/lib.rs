//! Selective, non-recursive directory watching.
//!
//! This crate watches only the directories a UI tree has expanded. Each
//! watched directory gets its own non-recursive watch, and the set of watches
//! is reconciled incrementally whenever the expanded set changes.
//!
//! # Overview
//!
//! - [`WatchBackend`] abstracts the OS mechanism; [`NotifyBackend`] is the
//!   production implementation on top of `notify`.
//! - [`WatcherRegistry`] owns the open handles and reconciles them against
//!   the expanded directories.
//! - [`translate`] maps `notify` events onto [`ChangeKind`](wsb_core::ChangeKind)s.
//! - [`IgnoreFilter`] drops noisy paths on the watcher thread;
//!   [`VisibilityFilter`] decides what the UI tree can see.
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
//! use camino::Utf8PathBuf;
//! use tokio::sync::mpsc;
//! use wsb_core::PathResolver;
//! use wsb_watcher::{IgnoreFilter, NotifyBackend, WatchSignal, WatcherRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (tx, mut rx) = mpsc::channel::<WatchSignal>(256);
//! let backend = NotifyBackend::new(tx, IgnoreFilter::default())?;
//! let mut registry = WatcherRegistry::new(backend);
//!
//! let resolver = PathResolver::with_root("/path/to/workspace")?;
//! registry.open_root(&resolver)?;
//! registry.reconcile(&resolver, &[Utf8PathBuf::from("src")])?;
//!
//! while let Some(signal) = rx.recv().await {
//!     if let WatchSignal::Event(event) = signal {
//!         println!("{} {}", event.kind, event.path);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! A directory whose watch cannot be opened is left unwatched. Failures caused
//! by hitting an OS limit are reported through [`WatchError::is_fatal`] so the
//! caller can tell the user:
//!
//! ```
//! use wsb_watcher::WatchError;
//!
//! fn handle_watch_error(err: &WatchError) {
//!     if err.is_fatal() {
//!         eprintln!("Watch limit reached: {err}");
//!     } else {
//!         eprintln!("Warning: {err}");
//!     }
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod events;
pub mod filter;
pub mod registry;

// Re-export error types
pub use error::WatchError;

// Re-export event types
pub use events::{RawEvent, WatchSignal, translate};

// Re-export filter types
pub use filter::{AcceptAllFilter, FileFilter, IgnoreFilter, VisibilityFilter};

// Re-export backend and registry types
pub use backend::{NotifyBackend, WatchBackend};
pub use registry::{ReconcileOutcome, WatchHandle, WatcherRegistry};
