//! Translation between the workspace root, absolute paths, and
//! workspace-relative paths.
//!
//! Relative paths are POSIX-style (`/`-separated, no leading slash) on every
//! platform. The workspace root itself is represented by [`ROOT_RELATIVE`].
//!
//! # Examples
//!
//! ```
//! use wsb_core::PathResolver;
//! use camino::Utf8Path;
//!
//! let resolver = PathResolver::with_root("/ws").unwrap();
//!
//! let absolute = resolver.to_absolute("/src/main.rs").unwrap();
//! assert_eq!(absolute.as_str(), "/ws/src/main.rs");
//!
//! let relative = resolver.to_relative(&absolute).unwrap();
//! assert_eq!(relative.as_str(), "src/main.rs");
//! ```

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::PathError;

/// Relative path of the workspace root.
pub const ROOT_RELATIVE: &str = ".";

/// Normalizes a workspace-relative path.
///
/// Splits on `/` and the platform separator, drops empty and `.` segments,
/// and joins the rest with `/`. An empty result is [`ROOT_RELATIVE`].
///
/// # Errors
///
/// Returns [`PathError::OutsideRoot`] if the path contains a `..` segment.
///
/// # Examples
///
/// ```
/// use wsb_core::normalize_relative;
///
/// assert_eq!(normalize_relative("/src//lib/./a.rs").unwrap().as_str(), "src/lib/a.rs");
/// assert_eq!(normalize_relative("").unwrap().as_str(), ".");
/// assert!(normalize_relative("../etc").is_err());
/// ```
pub fn normalize_relative(path: &str) -> Result<Utf8PathBuf, PathError> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(['/', std::path::MAIN_SEPARATOR]) {
        match segment {
            "" | "." => {}
            ".." => return Err(PathError::OutsideRoot(Utf8PathBuf::from(path))),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        Ok(Utf8PathBuf::from(ROOT_RELATIVE))
    } else {
        Ok(Utf8PathBuf::from(segments.join("/")))
    }
}

/// Returns the parent directory of a normalized relative path.
///
/// Top-level entries (and the root itself) have [`ROOT_RELATIVE`] as parent.
///
/// # Examples
///
/// ```
/// use wsb_core::parent_of;
/// use camino::Utf8Path;
///
/// assert_eq!(parent_of(Utf8Path::new("a/b/c.txt")).as_str(), "a/b");
/// assert_eq!(parent_of(Utf8Path::new("c.txt")).as_str(), ".");
/// ```
#[must_use]
pub fn parent_of(relative: &Utf8Path) -> &Utf8Path {
    match relative.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new(ROOT_RELATIVE),
    }
}

/// Resolves paths against a single workspace root.
///
/// The resolver starts unconfigured; every conversion fails with
/// [`PathError::NotConfigured`] until [`set_root`](Self::set_root) is called.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathResolver {
    root: Option<Utf8PathBuf>,
}

impl PathResolver {
    /// Creates an unconfigured resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self { root: None }
    }

    /// Creates a resolver for the given absolute root.
    pub fn with_root(root: impl Into<Utf8PathBuf>) -> Result<Self, PathError> {
        let mut resolver = Self::new();
        resolver.set_root(root)?;
        Ok(resolver)
    }

    /// Sets the workspace root, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::RelativeRoot`] if `root` is not absolute.
    pub fn set_root(&mut self, root: impl Into<Utf8PathBuf>) -> Result<(), PathError> {
        let root = root.into();
        if !root.is_absolute() {
            return Err(PathError::RelativeRoot(root));
        }
        self.root = Some(root);
        Ok(())
    }

    /// Unsets the workspace root.
    pub fn clear(&mut self) {
        self.root = None;
    }

    /// Returns `true` if a root is set.
    #[inline]
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.root.is_some()
    }

    /// Returns the workspace root.
    pub fn root(&self) -> Result<&Utf8Path, PathError> {
        self.root.as_deref().ok_or(PathError::NotConfigured)
    }

    /// Converts a workspace-relative path into an absolute path.
    ///
    /// A leading separator is ignored, so `/src` and `src` resolve to the same
    /// location. [`ROOT_RELATIVE`] resolves to the root itself.
    pub fn to_absolute(&self, relative: &str) -> Result<Utf8PathBuf, PathError> {
        let root = self.root()?;
        let normalized = normalize_relative(relative)?;

        if normalized == ROOT_RELATIVE {
            Ok(root.to_owned())
        } else {
            Ok(root.join(normalized))
        }
    }

    /// Converts an absolute path under the root into a relative POSIX path.
    ///
    /// The prefix match is component-wise: `/ws2/file` is not inside `/ws`.
    pub fn to_relative(&self, absolute: &Utf8Path) -> Result<Utf8PathBuf, PathError> {
        let root = self.root()?;
        let rest = absolute
            .strip_prefix(root)
            .map_err(|_| PathError::OutsideRoot(absolute.to_owned()))?;

        let joined = rest
            .components()
            .map(|component| component.as_str())
            .filter(|segment| *segment != ROOT_RELATIVE)
            .collect::<Vec<_>>()
            .join("/");

        if joined.is_empty() {
            Ok(Utf8PathBuf::from(ROOT_RELATIVE))
        } else {
            Ok(Utf8PathBuf::from(joined))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::with_root("/ws").expect("absolute root")
    }

    #[test]
    fn test_unconfigured_resolver_fails_fast() {
        let resolver = PathResolver::new();
        assert!(!resolver.is_configured());
        assert!(resolver.root().is_err_and(|e| e.is_not_configured()));
        assert!(
            resolver
                .to_absolute("src")
                .is_err_and(|e| e.is_not_configured())
        );
        assert!(
            resolver
                .to_relative(Utf8Path::new("/ws/src"))
                .is_err_and(|e| e.is_not_configured())
        );
    }

    #[test]
    fn test_relative_root_rejected() {
        let result = PathResolver::with_root("ws");
        assert!(matches!(result, Err(PathError::RelativeRoot(_))));
    }

    #[test]
    fn test_to_absolute_strips_leading_separator() {
        let resolver = resolver();
        assert_eq!(resolver.to_absolute("/src").expect("resolves"), "/ws/src");
        assert_eq!(resolver.to_absolute("src").expect("resolves"), "/ws/src");
    }

    #[test]
    fn test_to_absolute_root_aliases() {
        let resolver = resolver();
        assert_eq!(resolver.to_absolute(".").expect("resolves"), "/ws");
        assert_eq!(resolver.to_absolute("").expect("resolves"), "/ws");
        assert_eq!(resolver.to_absolute("/").expect("resolves"), "/ws");
    }

    #[test]
    fn test_to_absolute_with_trailing_slash_root() {
        let resolver = PathResolver::with_root("/ws/").expect("absolute root");
        assert_eq!(resolver.to_absolute("a/b.txt").expect("resolves"), "/ws/a/b.txt");
        assert_eq!(
            resolver
                .to_relative(Utf8Path::new("/ws/a/b.txt"))
                .expect("inside root"),
            "a/b.txt"
        );
    }

    #[test]
    fn test_to_absolute_rejects_parent_segments() {
        let resolver = resolver();
        assert!(matches!(
            resolver.to_absolute("src/../../etc/passwd"),
            Err(PathError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_to_relative_root_is_dot() {
        let resolver = resolver();
        assert_eq!(resolver.to_relative(Utf8Path::new("/ws")).expect("root"), ".");
    }

    #[test]
    fn test_to_relative_is_component_wise() {
        let resolver = resolver();
        assert!(matches!(
            resolver.to_relative(Utf8Path::new("/ws2/file.txt")),
            Err(PathError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let resolver = resolver();
        let inputs = [
            "src",
            "/src/main.rs",
            "a/b/c.txt",
            "a//b/./c.txt",
            ".",
            "",
            "deeply/nested/dir/",
            "with space/file name.md",
        ];

        for input in inputs {
            let absolute = resolver.to_absolute(input).expect("resolves");
            let relative = resolver.to_relative(&absolute).expect("inside root");
            let expected = normalize_relative(input).expect("normalizes");
            assert_eq!(relative, expected, "round trip of {input:?}");
        }
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of(Utf8Path::new("a/b/c.txt")).as_str(), "a/b");
        assert_eq!(parent_of(Utf8Path::new("a")).as_str(), ".");
        assert_eq!(parent_of(Utf8Path::new(".")).as_str(), ".");
    }

    #[test]
    fn test_clear_unsets_root() {
        let mut resolver = resolver();
        resolver.clear();
        assert!(!resolver.is_configured());
    }
}
