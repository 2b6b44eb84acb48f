//! Configuration structures for wsbridge.
//!
//! - [`WatchConfig`] - Watch backend settings (channel bound, ignored paths)
//! - [`SessionConfig`] - Notification delivery settings
//! - [`RecentConfig`] - Recent-folder store settings
//! - [`Config`] - Root configuration combining all settings
//!
//! Every section uses `#[serde(default)]`, so a configuration file only needs
//! to name the options it overrides.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for the watch backend.
///
/// # Examples
///
/// ```
/// use wsb_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.channel_capacity, 256);
/// assert_eq!(config.ignored, vec![".git/index.lock".to_owned()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Capacity of the raw event channel between the OS watcher thread and
    /// the dispatch loop.
    pub channel_capacity: usize,

    /// Path suffixes whose events are dropped before they reach the channel.
    ///
    /// `.git/index.lock` is created and removed constantly while git runs.
    pub ignored: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            ignored: vec![".git/index.lock".to_owned()],
        }
    }
}

/// Configuration for notification delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Capacity of the notification channel read by the UI consumer.
    pub notification_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            notification_capacity: 256,
        }
    }
}

/// Configuration for the recent-folder store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    /// Maximum number of folders remembered.
    pub max_entries: usize,

    /// Location of the store. `None` means the platform config directory.
    pub state_file: Option<Utf8PathBuf>,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            max_entries: 10,
            state_file: None,
        }
    }
}

/// Root configuration for wsbridge.
///
/// # Examples
///
/// ```
/// use wsb_core::Config;
///
/// let config: Config = serde_json::from_str(r#"{"recent": {"max_entries": 3}}"#).unwrap();
/// assert_eq!(config.recent.max_entries, 3);
/// assert_eq!(config.watch.channel_capacity, 256);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watch backend configuration.
    pub watch: WatchConfig,

    /// Notification delivery configuration.
    pub session: SessionConfig,

    /// Recent-folder store configuration.
    pub recent: RecentConfig,
}

impl Config {
    /// Loads and validates a configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks option values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("watch.channel_capacity", self.watch.channel_capacity),
            (
                "session.notification_capacity",
                self.session.notification_capacity,
            ),
            ("recent.max_entries", self.recent.max_entries),
        ];

        for (option, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidOption {
                    option: option.to_owned(),
                    reason: "must be greater than zero".to_owned(),
                });
            }
        }

        Ok(())
    }
}
