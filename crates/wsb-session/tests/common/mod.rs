//! Shared fixtures for session integration tests.
//!
//! [`Harness`] opens a session over a [`ScriptedBackend`] rooted in a
//! temporary directory. Tests inject raw events as if the OS had reported
//! them and read what reaches the notification stream.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use smallvec::smallvec;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wsb_core::{ChangeEvent, ChangeKind, Config};
use wsb_session::{
    Notification, NotificationStream, RawEvent, WatchBackend, WatchError, WatchSignal,
    WorkspaceSession,
};

const SENTINEL: &str = "zz-sentinel.txt";

/// One call made on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Watch(Utf8PathBuf),
    Unwatch(Utf8PathBuf),
}

impl BackendCall {
    pub fn dir(&self) -> &Utf8Path {
        match self {
            Self::Watch(dir) | Self::Unwatch(dir) => dir,
        }
    }
}

/// What the backend was asked to do, and which directories it refuses.
#[derive(Debug, Default)]
pub struct BackendLog {
    pub watch_calls: Vec<Utf8PathBuf>,
    pub unwatch_calls: Vec<Utf8PathBuf>,
    /// Every call that succeeded, in the order it was made.
    pub calls: Vec<BackendCall>,
    pub exhausted: FxHashSet<Utf8PathBuf>,
    /// Blocks each call for this long, to widen race windows.
    pub delay: Option<Duration>,
}

/// A backend that records calls instead of touching the OS.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    log: Arc<Mutex<BackendLog>>,
}

impl WatchBackend for ScriptedBackend {
    fn watch(&mut self, dir: &Utf8Path) -> Result<(), WatchError> {
        self.pause();
        let mut log = self.log.lock();
        log.watch_calls.push(dir.to_owned());
        if log.exhausted.contains(dir) {
            return Err(notify::Error::new(notify::ErrorKind::MaxFilesWatch).into());
        }
        log.calls.push(BackendCall::Watch(dir.to_owned()));
        Ok(())
    }

    fn unwatch(&mut self, dir: &Utf8Path) -> Result<(), WatchError> {
        self.pause();
        let mut log = self.log.lock();
        log.unwatch_calls.push(dir.to_owned());
        log.calls.push(BackendCall::Unwatch(dir.to_owned()));
        Ok(())
    }
}

impl ScriptedBackend {
    fn pause(&self) {
        let delay = self.log.lock().delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

pub struct Harness {
    pub session: WorkspaceSession<ScriptedBackend>,
    pub stream: NotificationStream,
    pub events: mpsc::Sender<WatchSignal>,
    pub log: Arc<Mutex<BackendLog>>,
    pub root: Utf8PathBuf,
    dir: TempDir,
}

impl Harness {
    /// Opens a session on a fresh temporary directory.
    pub async fn open() -> Self {
        let mut harness = Self::unopened();
        let dir = harness.tempdir();
        harness.root = harness.session.set_working_directory(&dir).await.unwrap();

        match harness.next().await {
            Notification::WorkingDirChanged { path } => assert_eq!(path, harness.root),
            other => panic!("expected workingDirChanged, got {other:?}"),
        }
        harness
    }

    /// Creates a session without opening a workspace.
    pub fn unopened() -> Self {
        let backend = ScriptedBackend::default();
        let log = Arc::clone(&backend.log);
        let mut sender = None;

        let (session, stream) = WorkspaceSession::with_backend(&Config::default(), |tx| {
            sender = Some(tx);
            Ok(backend)
        })
        .unwrap();

        let dir = TempDir::new().unwrap();
        Self {
            session,
            stream,
            events: sender.unwrap(),
            log,
            root: Utf8PathBuf::new(),
            dir,
        }
    }

    /// The temporary directory owned by this harness.
    pub fn tempdir(&self) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(self.dir.path().canonicalize().unwrap()).unwrap()
    }

    /// Creates a file on disk under the root.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Injects an event as if the OS had reported it.
    pub async fn inject(&self, kind: ChangeKind, relative: &str) {
        self.inject_absolute(kind, self.root.join(relative)).await;
    }

    pub async fn inject_absolute(&self, kind: ChangeKind, absolute: Utf8PathBuf) {
        self.events
            .send(WatchSignal::Event(RawEvent::new(kind, absolute)))
            .await
            .unwrap();
    }

    /// Injects a runtime backend error for `relative`.
    pub async fn inject_error(&self, relative: &str, error: WatchError) {
        self.events
            .send(WatchSignal::Error {
                paths: smallvec![self.root.join(relative)],
                error,
            })
            .await
            .unwrap();
    }

    /// Waits for the next notification.
    pub async fn next(&mut self) -> Notification {
        tokio::time::timeout(Duration::from_secs(2), self.stream.recv())
            .await
            .expect("timed out waiting for a notification")
            .expect("notification stream closed")
    }

    /// Waits for the next notification and expects a change.
    pub async fn next_change(&mut self) -> ChangeEvent {
        match self.next().await {
            Notification::Change(event) => event,
            other => panic!("expected a change, got {other:?}"),
        }
    }

    /// Asserts that nothing was emitted for the events injected so far.
    ///
    /// Injects a top-level event, which is always visible, and checks that
    /// it is the next thing on the stream. The dispatch loop handles events in
    /// order, so anything emitted earlier would arrive first.
    pub async fn assert_quiet(&mut self) {
        self.inject(ChangeKind::Created, SENTINEL).await;
        assert_eq!(
            self.next_change().await,
            ChangeEvent::new(ChangeKind::Created, SENTINEL)
        );
    }

    /// Absolute paths of the directories currently watched.
    pub async fn watched(&self) -> Vec<Utf8PathBuf> {
        self.session.watched_directories().await
    }

    /// Waits until the watched set satisfies `check`.
    pub async fn wait_for_watched(&self, check: impl Fn(&[Utf8PathBuf]) -> bool) {
        for _ in 0..100 {
            if check(&self.watched().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("watched set never matched: {:?}", self.watched().await);
    }
}
