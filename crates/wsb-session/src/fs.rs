//! Workspace-relative file operations.
//!
//! Every path is resolved against the workspace root first, so each
//! operation fails with [`SessionError::NotConfigured`] until a root is set.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use wsb_core::{ChangeEvent, ChangeKind, DirEntry, FileStat, normalize_relative};
use wsb_watcher::WatchBackend;

use crate::error::SessionError;
use crate::session::WorkspaceSession;

/// How [`WorkspaceSession::read_file`] returns file contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadEncoding {
    /// Decode as UTF-8 text.
    #[default]
    Utf8,
    /// Return the raw bytes.
    Binary,
}

/// Options for [`WorkspaceSession::read_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadOptions {
    /// Text or bytes.
    pub encoding: ReadEncoding,
}

impl ReadOptions {
    /// Options for reading raw bytes.
    #[must_use]
    pub const fn binary() -> Self {
        Self {
            encoding: ReadEncoding::Binary,
        }
    }
}

/// Options for [`WorkspaceSession::write_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WriteOptions {
    /// Create missing parent directories first.
    pub create_parents: bool,
}

/// File contents as returned by [`WorkspaceSession::read_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileContent {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl FileContent {
    /// The content as bytes, whichever way it was read.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// The content as text, if it was read as text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }
}

impl<B: WatchBackend> WorkspaceSession<B> {
    /// Lists the direct children of a directory, sorted by name.
    ///
    /// Entries whose names are not valid UTF-8 are skipped. Child directories
    /// are remembered so that a later untyped removal of one is reported as
    /// `dirRemoved`.
    pub async fn list_directory(&self, relative: &str) -> Result<Vec<DirEntry>, SessionError> {
        let absolute = self.resolve(relative)?;
        let io_err = |e| SessionError::io("list directory", relative, e);

        let mut reader = tokio::fs::read_dir(&absolute).await.map_err(io_err)?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await.map_err(io_err)? {
            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(dir = %absolute, "Skipping non-UTF-8 directory entry");
                continue;
            };
            let is_directory = entry.file_type().await.map_err(io_err)?.is_dir();
            if is_directory {
                let key = normalize_relative(&format!("{relative}/{name}"))?;
                self.shared.pipeline.remember_directory(key);
            }
            entries.push(DirEntry::new(name, is_directory));
        }

        entries.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Reads a file as text or bytes.
    pub async fn read_file(
        &self,
        relative: &str,
        options: ReadOptions,
    ) -> Result<FileContent, SessionError> {
        let absolute = self.resolve(relative)?;
        let io_err = |e| SessionError::io("read file", relative, e);

        match options.encoding {
            ReadEncoding::Utf8 => tokio::fs::read_to_string(&absolute)
                .await
                .map(FileContent::Text)
                .map_err(io_err),
            ReadEncoding::Binary => tokio::fs::read(&absolute)
                .await
                .map(FileContent::Bytes)
                .map_err(io_err),
        }
    }

    /// Writes a file, replacing its contents.
    ///
    /// The content is remembered first, so the change event the OS reports
    /// for this write is not echoed back to the UI.
    pub async fn write_file(
        &self,
        relative: &str,
        content: impl AsRef<[u8]>,
        options: WriteOptions,
    ) -> Result<(), SessionError> {
        let absolute = self.resolve(relative)?;
        let key = normalize_relative(relative)?;
        let content = content.as_ref();

        self.shared.pipeline.echo.record_local_write(&key, content);

        if options.create_parents {
            if let Some(parent) = absolute.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| SessionError::io("create parent directories", relative, e))?;
            }
        }

        tokio::fs::write(&absolute, content)
            .await
            .map_err(|e| SessionError::io("write file", relative, e))?;

        tracing::debug!(path = %key, bytes = content.len(), "Wrote file");
        Ok(())
    }

    /// Creates a single directory. The parent must exist.
    pub async fn make_directory(&self, relative: &str) -> Result<(), SessionError> {
        let absolute = self.resolve(relative)?;
        tokio::fs::create_dir(&absolute)
            .await
            .map_err(|e| SessionError::io("create directory", relative, e))?;

        self.shared
            .pipeline
            .remember_directory(normalize_relative(relative)?);
        Ok(())
    }

    /// Removes a directory and everything beneath it.
    ///
    /// A `dirRemoved` notification is emitted directly, whether or not the
    /// directory is visible or watched.
    pub async fn remove_directory(&self, relative: &str) -> Result<(), SessionError> {
        let absolute = self.resolve(relative)?;
        let key = normalize_relative(relative)?;

        tokio::fs::remove_dir_all(&absolute)
            .await
            .map_err(|e| SessionError::io("remove directory", relative, e))?;

        self.shared.pipeline.forget_directory(&key);
        self.shared
            .emitter
            .emit(ChangeEvent::new(ChangeKind::DirRemoved, key))
            .await;
        Ok(())
    }

    /// Removes a file.
    pub async fn remove_file(&self, relative: &str) -> Result<(), SessionError> {
        let absolute = self.resolve(relative)?;
        tokio::fs::remove_file(&absolute)
            .await
            .map_err(|e| SessionError::io("remove file", relative, e))
    }

    /// Renames a file or directory within the workspace.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), SessionError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| SessionError::io("rename", from, e))?;

        let pipeline = &self.shared.pipeline;
        let from_key = normalize_relative(from)?;
        if pipeline.is_known_directory(&from_key) {
            pipeline.forget_directory(&from_key);
            pipeline.remember_directory(normalize_relative(to)?);
        }
        Ok(())
    }

    /// Returns metadata, following symbolic links.
    ///
    /// `Ok(None)` means the entry could not be inspected (usually because it
    /// does not exist).
    pub async fn stat(&self, relative: &str) -> Result<Option<FileStat>, SessionError> {
        let absolute = self.resolve(relative)?;
        Ok(tokio::fs::metadata(&absolute)
            .await
            .inspect_err(|e| tracing::trace!(path = %absolute, error = %e, "stat failed"))
            .ok()
            .map(|metadata| FileStat::from_metadata(&metadata)))
    }

    /// Returns metadata without following symbolic links.
    pub async fn lstat(&self, relative: &str) -> Result<Option<FileStat>, SessionError> {
        let absolute = self.resolve(relative)?;
        Ok(tokio::fs::symlink_metadata(&absolute)
            .await
            .inspect_err(|e| tracing::trace!(path = %absolute, error = %e, "lstat failed"))
            .ok()
            .map(|metadata| FileStat::from_metadata(&metadata)))
    }

    /// Returns `true` if something exists at the path.
    pub async fn path_exists(&self, relative: &str) -> Result<bool, SessionError> {
        let absolute: Utf8PathBuf = self.resolve(relative)?;
        Ok(tokio::fs::try_exists(&absolute).await.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Notification;
    use camino::Utf8Path;
    use tempfile::TempDir;
    use wsb_core::Config;
    use wsb_watcher::WatchError;

    struct NullBackend;

    impl WatchBackend for NullBackend {
        fn watch(&mut self, _dir: &Utf8Path) -> Result<(), WatchError> {
            Ok(())
        }

        fn unwatch(&mut self, _dir: &Utf8Path) -> Result<(), WatchError> {
            Ok(())
        }
    }

    async fn open() -> (
        TempDir,
        Utf8PathBuf,
        WorkspaceSession<NullBackend>,
        crate::NotificationStream,
    ) {
        let dir = TempDir::new().unwrap();
        let (session, mut stream) =
            WorkspaceSession::with_backend(&Config::default(), |_| Ok(NullBackend)).unwrap();
        let root = session
            .set_working_directory(Utf8Path::from_path(dir.path()).unwrap())
            .await
            .unwrap();
        // Consume the workingDirChanged announcement.
        stream.recv().await.unwrap();
        (dir, root, session, stream)
    }

    #[tokio::test]
    async fn test_operations_require_root() {
        let (session, _stream) =
            WorkspaceSession::with_backend(&Config::default(), |_| Ok(NullBackend)).unwrap();

        assert!(session.list_directory(".").await.is_err_and(|e| e.is_not_configured()));
        assert!(
            session
                .read_file("a.txt", ReadOptions::default())
                .await
                .is_err_and(|e| e.is_not_configured())
        );
        assert!(session.stat("a.txt").await.is_err_and(|e| e.is_not_configured()));
    }

    #[tokio::test]
    async fn test_list_directory_sorted() {
        let (_dir, root, session, _stream) = open().await;
        std::fs::write(root.join("b.txt"), "").unwrap();
        std::fs::write(root.join("a.txt"), "").unwrap();
        std::fs::create_dir(root.join("c")).unwrap();

        let entries = session.list_directory(".").await.unwrap();
        assert_eq!(
            entries,
            vec![
                DirEntry::new("a.txt", false),
                DirEntry::new("b.txt", false),
                DirEntry::new("c", true),
            ]
        );
    }

    #[tokio::test]
    async fn test_known_directories_follow_operations() {
        let (_dir, root, session, _stream) = open().await;
        std::fs::create_dir_all(root.join("c/d")).unwrap();
        std::fs::write(root.join("c/e.txt"), "").unwrap();
        let pipeline = &session.shared.pipeline;

        session.list_directory("c").await.unwrap();
        assert!(pipeline.is_known_directory(Utf8Path::new("c/d")));
        assert!(!pipeline.is_known_directory(Utf8Path::new("c/e.txt")));

        session.make_directory("/f").await.unwrap();
        assert!(pipeline.is_known_directory(Utf8Path::new("f")));

        session.rename("f", "g").await.unwrap();
        assert!(!pipeline.is_known_directory(Utf8Path::new("f")));
        assert!(pipeline.is_known_directory(Utf8Path::new("g")));

        session.remove_directory("c").await.unwrap();
        assert!(!pipeline.is_known_directory(Utf8Path::new("c/d")));
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (_dir, _root, session, _stream) = open().await;

        session
            .write_file("/notes/today.md", "hello", WriteOptions { create_parents: true })
            .await
            .unwrap();

        let text = session
            .read_file("notes/today.md", ReadOptions::default())
            .await
            .unwrap();
        assert_eq!(text.as_text(), Some("hello"));

        let bytes = session
            .read_file("notes/today.md", ReadOptions::binary())
            .await
            .unwrap();
        assert_eq!(bytes, FileContent::Bytes(b"hello".to_vec()));
        assert!(session.shared.pipeline.echo.is_pending(Utf8Path::new("notes/today.md")));
    }

    #[tokio::test]
    async fn test_write_without_parents_fails() {
        let (_dir, _root, session, _stream) = open().await;

        let error = session
            .write_file("missing/a.txt", "x", WriteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.io_kind(), Some(std::io::ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_as_text_fails() {
        let (_dir, root, session, _stream) = open().await;
        std::fs::write(root.join("blob.bin"), [0xff, 0xfe, 0x00]).unwrap();

        let error = session
            .read_file("blob.bin", ReadOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.io_kind(), Some(std::io::ErrorKind::InvalidData));

        let bytes = session
            .read_file("blob.bin", ReadOptions::binary())
            .await
            .unwrap();
        assert_eq!(bytes.as_bytes(), &[0xff, 0xfe, 0x00]);
    }

    #[tokio::test]
    async fn test_remove_directory_emits_dir_removed() {
        let (_dir, root, session, mut stream) = open().await;
        std::fs::create_dir_all(root.join("build/out")).unwrap();
        std::fs::write(root.join("build/out/a.o"), "").unwrap();

        session.remove_directory("build").await.unwrap();

        assert!(!root.join("build").exists());
        assert_eq!(
            stream.recv().await,
            Some(Notification::Change(ChangeEvent::new(
                ChangeKind::DirRemoved,
                "build"
            )))
        );
    }

    #[tokio::test]
    async fn test_make_rename_remove() {
        let (_dir, root, session, _stream) = open().await;

        session.make_directory("docs").await.unwrap();
        session
            .write_file("docs/a.md", "# A", WriteOptions::default())
            .await
            .unwrap();
        session.rename("docs/a.md", "docs/b.md").await.unwrap();

        assert!(!session.path_exists("docs/a.md").await.unwrap());
        assert!(session.path_exists("docs/b.md").await.unwrap());

        session.remove_file("docs/b.md").await.unwrap();
        assert!(!root.join("docs/b.md").exists());
    }

    #[tokio::test]
    async fn test_stat_and_lstat() {
        let (_dir, root, session, _stream) = open().await;
        std::fs::write(root.join("a.txt"), "12345").unwrap();

        let stat = session.stat("a.txt").await.unwrap().unwrap();
        assert_eq!(stat.size, 5);
        assert!(stat.is_file);

        let dir_stat = session.lstat(".").await.unwrap().unwrap();
        assert!(dir_stat.is_directory);

        assert_eq!(session.stat("missing.txt").await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lstat_does_not_follow_symlinks() {
        let (_dir, root, session, _stream) = open().await;
        std::fs::write(root.join("target.txt"), "x").unwrap();
        std::os::unix::fs::symlink(root.join("target.txt"), root.join("link.txt")).unwrap();

        let followed = session.stat("link.txt").await.unwrap().unwrap();
        assert!(!followed.is_symbolic_link);

        let link = session.lstat("link.txt").await.unwrap().unwrap();
        assert!(link.is_symbolic_link);
    }

    #[tokio::test]
    async fn test_parent_escape_is_rejected() {
        let (_dir, _root, session, _stream) = open().await;

        let error = session
            .write_file("../outside.txt", "x", WriteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, SessionError::Path(_)));
    }
}
