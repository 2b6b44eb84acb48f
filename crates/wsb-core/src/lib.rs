//! Core types, errors, and path handling for the wsbridge workspace.
//!
//! This crate provides the foundational pieces shared by the watcher, the
//! session, and the CLI front end:
//!
//! - [`PathResolver`] for translating between absolute on-disk paths and
//!   workspace-relative POSIX paths
//! - Error types ([`PathError`], [`ConfigError`])
//! - Configuration structures ([`Config`] and its sections)
//! - Domain types ([`ChangeKind`], [`ChangeEvent`], [`DirEntry`], [`FileStat`])
//!
//! # Crate Dependencies
//!
//! ```text
//! wsb-cli ──► wsb-session ──► wsb-watcher ──► wsb-core
//!                        └──────────────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod resolver;
pub mod types;

pub use config::{Config, RecentConfig, SessionConfig, WatchConfig};
pub use error::{ConfigError, PathError};
pub use resolver::{PathResolver, ROOT_RELATIVE, normalize_relative, parent_of};
pub use types::{ChangeEvent, ChangeKind, DirEntry, FileStat};
