//! Event filtering.
//!
//! Two kinds of filtering happen on the way to the UI:
//!
//! - **At the source**, on the watcher thread, an [`IgnoreFilter`] drops
//!   events for paths that are never interesting (lock files that git creates
//!   and removes on every command). This keeps channel traffic down.
//! - **At dispatch**, a [`VisibilityFilter`] drops events for entries the UI
//!   tree is not currently showing.
//!
//! Both implement [`FileFilter`].
//!
//! # Examples
//!
//! ```
//! use wsb_watcher::{FileFilter, IgnoreFilter};
//! use camino::Utf8Path;
//!
//! let filter = IgnoreFilter::default();
//! assert!(filter.should_process(Utf8Path::new("/ws/src/main.rs")));
//! assert!(!filter.should_process(Utf8Path::new("/ws/.git/index.lock")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use wsb_core::{ROOT_RELATIVE, WatchConfig, parent_of};

/// A filter for determining which events to process.
///
/// # Thread Safety
///
/// Filters must be [`Send`] and [`Sync`] because source-side filters run on
/// the OS watcher thread. They must also be `'static` to be moved into the
/// watcher's event handler.
///
/// # Examples
///
/// ```
/// use wsb_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct NoNodeModules;
///
/// impl FileFilter for NoNodeModules {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         !path.as_str().contains("node_modules")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if an event for `path` should be processed.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Drops events whose path ends with one of a set of relative suffixes.
///
/// Suffixes are matched component-wise, so `.git/index.lock` matches
/// `/ws/.git/index.lock` but not `/ws/my.git/index.lock.bak`.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    suffixes: SmallVec<[Utf8PathBuf; 4]>,
}

impl IgnoreFilter {
    /// Creates a filter that ignores nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            suffixes: SmallVec::new(),
        }
    }

    /// Creates a filter from the configured ignore list.
    #[must_use]
    pub fn from_config(config: &WatchConfig) -> Self {
        config
            .ignored
            .iter()
            .fold(Self::empty(), |filter, suffix| filter.ignore(suffix))
    }

    /// Adds a suffix to ignore.
    #[must_use]
    pub fn ignore(mut self, suffix: &str) -> Self {
        let suffix = Utf8PathBuf::from(suffix.trim_start_matches('/'));
        if !suffix.as_str().is_empty() && !self.suffixes.contains(&suffix) {
            self.suffixes.push(suffix);
        }
        self
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

impl FileFilter for IgnoreFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        !self.suffixes.iter().any(|suffix| path.ends_with(suffix))
    }
}

/// Decides whether a relative path is shown by the UI tree.
///
/// A path is visible when it, or its parent directory, is expanded. The root
/// (`.`) is always expanded. Expanded paths keep the order in which the UI
/// sent them.
///
/// # Examples
///
/// ```
/// use wsb_watcher::VisibilityFilter;
/// use camino::{Utf8Path, Utf8PathBuf};
///
/// let mut filter = VisibilityFilter::new();
/// filter.set_expanded([Utf8PathBuf::from("a/b")]);
///
/// assert!(filter.is_visible(Utf8Path::new("a/b/c.txt")));
/// assert!(filter.is_visible(Utf8Path::new("top.txt")));
/// assert!(!filter.is_visible(Utf8Path::new("a/x/y.txt")));
/// ```
#[derive(Debug, Clone)]
pub struct VisibilityFilter {
    order: Vec<Utf8PathBuf>,
    members: FxHashSet<Utf8PathBuf>,
}

impl VisibilityFilter {
    /// Creates a filter with only the root expanded.
    #[must_use]
    pub fn new() -> Self {
        let mut filter = Self {
            order: Vec::new(),
            members: FxHashSet::default(),
        };
        filter.reset();
        filter
    }

    /// Collapses everything except the root.
    pub fn reset(&mut self) {
        self.set_expanded(std::iter::empty());
    }

    /// Replaces the expanded set with normalized relative paths.
    pub fn set_expanded(&mut self, paths: impl IntoIterator<Item = Utf8PathBuf>) {
        self.order.clear();
        self.members.clear();

        let root = Utf8PathBuf::from(ROOT_RELATIVE);
        self.members.insert(root.clone());
        self.order.push(root);

        for path in paths {
            if self.members.insert(path.clone()) {
                self.order.push(path);
            }
        }
    }

    /// Returns `true` if `relative` is expanded.
    #[inline]
    #[must_use]
    pub fn is_expanded(&self, relative: &Utf8Path) -> bool {
        self.members.contains(relative)
    }

    /// Returns `true` if `relative` or its parent directory is expanded.
    #[must_use]
    pub fn is_visible(&self, relative: &Utf8Path) -> bool {
        self.is_expanded(relative) || self.is_expanded(parent_of(relative))
    }

    /// Returns the expanded paths, root first, in the order they were set.
    #[must_use]
    pub fn expanded(&self) -> &[Utf8PathBuf] {
        &self.order
    }
}

impl Default for VisibilityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileFilter for VisibilityFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.is_visible(path)
    }
}
