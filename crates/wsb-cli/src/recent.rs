//! The recent-folder store.
//!
//! A small JSON file listing the workspaces opened most recently, newest
//! first. By default it lives at `<config_dir>/wsbridge/recent.json`.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wsb_core::{ConfigError, RecentConfig};

/// On-disk layout of the store.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecentFile {
    #[serde(default)]
    folders: Vec<Utf8PathBuf>,
}

/// Recently opened workspace folders, newest first.
#[derive(Debug)]
pub struct RecentFolders {
    path: Utf8PathBuf,
    max_entries: usize,
    folders: Vec<Utf8PathBuf>,
}

impl RecentFolders {
    /// The platform default location of the store, if the platform has a
    /// config directory.
    pub fn default_location() -> Option<Utf8PathBuf> {
        let dir = dirs::config_dir()?;
        let dir = Utf8PathBuf::from_path_buf(dir).ok()?;
        Some(dir.join("wsbridge").join("recent.json"))
    }

    /// Opens the store configured in `config`.
    pub fn open(config: &RecentConfig) -> Result<Self, ConfigError> {
        let path = match &config.state_file {
            Some(path) => path.clone(),
            None => Self::default_location().ok_or_else(|| ConfigError::InvalidOption {
                option: "recent.state_file".to_owned(),
                reason: "no config directory on this platform; set it explicitly".to_owned(),
            })?,
        };
        Self::load(path, config.max_entries)
    }

    /// Loads the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<Utf8PathBuf>, max_entries: usize) -> Result<Self, ConfigError> {
        let path = path.into();

        let mut folders = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<RecentFile>(&text)?.folders,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(ConfigError::io(path, e)),
        };
        folders.truncate(max_entries);

        debug!(path = %path, count = folders.len(), "Loaded recent folders");
        Ok(Self {
            path,
            max_entries,
            folders,
        })
    }

    /// The remembered folders, newest first.
    pub fn list(&self) -> &[Utf8PathBuf] {
        &self.folders
    }

    /// The file backing this store.
    pub fn location(&self) -> &Utf8Path {
        &self.path
    }

    /// Moves `folder` to the front, dropping the oldest entries past the
    /// limit, and saves.
    pub fn add(&mut self, folder: &Utf8Path) -> Result<(), ConfigError> {
        self.folders.retain(|existing| existing != folder);
        self.folders.insert(0, folder.to_owned());
        self.folders.truncate(self.max_entries);
        self.save()
    }

    /// Forgets `folder` and saves. Returns `true` if it was remembered.
    pub fn remove(&mut self, folder: &Utf8Path) -> Result<bool, ConfigError> {
        let before = self.folders.len();
        self.folders.retain(|existing| existing != folder);
        if self.folders.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Forgets folders that are no longer directories and saves.
    ///
    /// Returns the folders that were dropped.
    pub fn prune_missing(&mut self) -> Result<Vec<Utf8PathBuf>, ConfigError> {
        let (kept, dropped): (Vec<_>, Vec<_>) =
            self.folders.drain(..).partition(|folder| folder.is_dir());
        self.folders = kept;

        if !dropped.is_empty() {
            info!(count = dropped.len(), "Dropped missing recent folders");
            self.save()?;
        }
        Ok(dropped)
    }

    fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }

        let file = RecentFile {
            folders: self.folders.clone(),
        };
        let text = serde_json::to_string_pretty(&file)?;

        // Write-then-rename: readers never see a half-written store.
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, text).map_err(|e| ConfigError::io(&staging, e))?;
        std::fs::rename(&staging, &self.path).map_err(|e| ConfigError::io(&self.path, e))?;
        Ok(())
    }
}
