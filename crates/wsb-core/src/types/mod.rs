//! Domain types shared across the workspace.
//!
//! - [`kind`] - Normalized change kinds
//! - [`event`] - Workspace-relative change events
//! - [`entry`] - Directory listings and file metadata
//!
//! All public types are re-exported here and at the crate root.

mod entry;
mod event;
mod kind;

pub use entry::{DirEntry, FileStat};
pub use event::ChangeEvent;
pub use kind::ChangeKind;
