//! Error types for the wsb-core crate.
//!
//! - [`PathError`] covers workspace path resolution.
//! - [`ConfigError`] covers loading and validating configuration.

use camino::Utf8PathBuf;

/// Errors that can occur while resolving workspace paths.
///
/// # Examples
///
/// ```
/// use wsb_core::PathError;
///
/// let error = PathError::NotConfigured;
/// assert!(error.to_string().contains("not set"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// A path operation was attempted before a workspace root was set.
    #[error("workspace root is not set")]
    NotConfigured,

    /// The workspace root must be an absolute path.
    #[error("workspace root must be absolute: {0}")]
    RelativeRoot(Utf8PathBuf),

    /// The path does not resolve to a location inside the workspace root.
    #[error("path is outside the workspace root: {0}")]
    OutsideRoot(Utf8PathBuf),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8(std::path::PathBuf),
}

impl PathError {
    /// Returns `true` if this is [`PathError::NotConfigured`].
    #[inline]
    #[must_use]
    pub const fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured)
    }
}

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use wsb_core::ConfigError;
///
/// let error = ConfigError::InvalidOption {
///     option: "watch.channel_capacity".to_owned(),
///     reason: "must be positive".to_owned(),
/// };
/// assert!(error.to_string().contains("channel_capacity"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading or writing configuration state.
    #[error("failed to access configuration file '{path}': {source}")]
    Io {
        /// The file being accessed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_display() {
        let error = PathError::NotConfigured;
        assert!(error.is_not_configured());
        assert_eq!(error.to_string(), "workspace root is not set");
    }

    #[test]
    fn test_outside_root_display() {
        let error = PathError::OutsideRoot(Utf8PathBuf::from("/elsewhere/file.txt"));
        assert!(!error.is_not_configured());
        assert!(error.to_string().contains("/elsewhere/file.txt"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::InvalidOption {
            option: "recent.max_entries".to_owned(),
            reason: "must be positive".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("recent.max_entries"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_io_display_includes_path() {
        let error = ConfigError::io(
            "/etc/wsbridge.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(error.to_string().contains("/etc/wsbridge.json"));
    }
}
