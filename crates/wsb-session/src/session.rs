//! The per-workspace session object.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ WorkspaceSession                                                     │
//! │                                                                      │
//! │  set_working_directory / set_expanded_paths / close_*                │
//! │        │                                                             │
//! │        ▼                                                             │
//! │  tokio::Mutex<WatcherRegistry> ──watch/unwatch──► WatchBackend       │
//! │        │ (held for a whole reconcile)                  │             │
//! │        ▼                                               │ WatchSignal │
//! │  EventPipeline (parking_lot locks)                     ▼             │
//! │    resolver · visibility · echo   ◄──── dispatch task (one per       │
//! │                                          session, never locks the    │
//! │                                          registry)                   │
//! │                                               │                      │
//! │                                               ▼                      │
//! │                                         ChangeEmitter ──► stream     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The dispatch task never waits on the registry mutex: a reconcile holding
//! that mutex may itself be waiting for the OS watcher thread, which may be
//! waiting for room in the event channel. Evictions after runtime watch
//! errors therefore run in a separate task.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wsb_core::{Config, PathError, normalize_relative};
use wsb_watcher::{
    IgnoreFilter, NotifyBackend, ReconcileOutcome, WatchBackend, WatchError, WatchSignal,
    WatcherRegistry,
};

use crate::emitter::{self, ChangeEmitter, FatalReason, FatalWatchError, NotificationStream};
use crate::error::SessionError;
use crate::pipeline::EventPipeline;

/// State shared between the session handle and its dispatch task.
pub(crate) struct Shared<B> {
    pub(crate) pipeline: EventPipeline,
    pub(crate) registry: Mutex<WatcherRegistry<B>>,
    pub(crate) emitter: ChangeEmitter,
}

/// One open workspace: its root, its watches and its notification stream.
///
/// Created with [`WorkspaceSession::new`], which also returns the
/// [`NotificationStream`] the UI reads from. Dropping the session stops its
/// dispatch task and closes every watch.
///
/// # Examples
///
/// ```no_run
/// use camino::Utf8Path;
/// use wsb_core::Config;
/// use wsb_session::WorkspaceSession;
///
/// # async fn example() -> Result<(), wsb_session::SessionError> {
/// let (session, mut notifications) = WorkspaceSession::new(&Config::default())?;
///
/// session.set_working_directory(Utf8Path::new("/home/me/project")).await?;
/// session.set_expanded_paths(["src", "src/components"]).await?;
///
/// while let Some(notification) = notifications.recv().await {
///     println!("{notification:?}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct WorkspaceSession<B: WatchBackend = NotifyBackend> {
    pub(crate) shared: Arc<Shared<B>>,
    cancellation_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<B: WatchBackend> std::fmt::Debug for WorkspaceSession<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceSession")
            .field("root", &self.working_directory())
            .field("expanded", &self.expanded_paths())
            .field("cancelled", &self.cancellation_token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl WorkspaceSession<NotifyBackend> {
    /// Creates a session backed by the platform's `notify` watcher.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Watch`] if the OS watcher cannot be created.
    pub fn new(config: &Config) -> Result<(Self, NotificationStream), SessionError> {
        let filter = IgnoreFilter::from_config(&config.watch);
        Self::with_backend(config, move |event_tx| NotifyBackend::new(event_tx, filter))
    }
}

impl<B: WatchBackend> WorkspaceSession<B> {
    /// Creates a session over a custom backend.
    ///
    /// `make_backend` receives the sending half of the raw event channel; the
    /// backend must deliver every event and runtime error through it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns whatever error `make_backend` fails with.
    pub fn with_backend<F>(
        config: &Config,
        make_backend: F,
    ) -> Result<(Self, NotificationStream), SessionError>
    where
        F: FnOnce(mpsc::Sender<WatchSignal>) -> Result<B, WatchError>,
    {
        let (event_tx, event_rx) = mpsc::channel(config.watch.channel_capacity.max(1));
        let backend = make_backend(event_tx)?;
        let (emitter, stream) = emitter::channel(config.session.notification_capacity);

        let shared = Arc::new(Shared {
            pipeline: EventPipeline::new(),
            registry: Mutex::new(WatcherRegistry::new(backend)),
            emitter,
        });

        let cancellation_token = CancellationToken::new();
        let task = tokio::spawn(dispatch(
            Arc::clone(&shared),
            event_rx,
            cancellation_token.clone(),
        ));

        debug!(
            channel_capacity = config.watch.channel_capacity,
            notification_capacity = config.session.notification_capacity,
            "Created workspace session"
        );

        Ok((
            Self {
                shared,
                cancellation_token,
                task: Some(task),
            },
            stream,
        ))
    }

    /// Opens `path` as the workspace root.
    ///
    /// Closes every existing watch, collapses the tree, forgets pending local
    /// writes, then watches the new root and announces it on the stream. A
    /// root whose watch cannot be opened is still set; the failure is logged
    /// (and reported on the stream if an OS limit was hit).
    ///
    /// Returns the canonical root.
    ///
    /// # Errors
    ///
    /// Fails if `path` does not exist, is not a directory, or is not valid
    /// UTF-8 once canonicalized. The previous workspace is left untouched in
    /// that case.
    pub async fn set_working_directory(&self, path: &Utf8Path) -> Result<Utf8PathBuf, SessionError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| SessionError::io("open workspace", path, e))?;
        if !metadata.is_dir() {
            return Err(SessionError::NotADirectory(path.to_owned()));
        }

        let canonical = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| SessionError::io("open workspace", path, e))?;
        let root = Utf8PathBuf::from_path_buf(canonical).map_err(PathError::NonUtf8)?;

        let outcome = {
            let mut registry = self.shared.registry.lock().await;
            registry.close_all();

            let pipeline = &self.shared.pipeline;
            pipeline.echo.clear();
            pipeline.visibility.write().reset();
            pipeline.forget_directories();
            pipeline.resolver.write().set_root(root.clone())?;

            let resolver = pipeline.resolver.read().clone();
            registry.open_root(&resolver)?
        };

        info!(root = %root, "Workspace opened");
        self.report_failures(&outcome).await;
        self.shared.emitter.working_dir_changed(&root).await;

        Ok(root)
    }

    /// Replaces the set of expanded directories and reconciles the watches.
    ///
    /// Paths are workspace-relative. Entries that do not normalize (such as
    /// ones containing `..`) are logged and skipped. The root is always
    /// expanded.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConfigured`] if no workspace is open.
    pub async fn set_expanded_paths<I>(&self, paths: I) -> Result<ReconcileOutcome, SessionError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let expanded: Vec<Utf8PathBuf> = paths
            .into_iter()
            .filter_map(|path| match normalize_relative(path.as_ref()) {
                Ok(normalized) => Some(normalized),
                Err(error) => {
                    warn!(path = path.as_ref(), error = %error, "Skipping invalid expanded path");
                    None
                }
            })
            .collect();

        let outcome = {
            let mut registry = self.shared.registry.lock().await;
            let resolver = self.shared.pipeline.resolver.read().clone();
            let outcome = registry.reconcile(&resolver, &expanded)?;
            self.shared.pipeline.visibility.write().set_expanded(expanded);
            outcome
        };

        self.report_failures(&outcome).await;
        Ok(outcome)
    }

    /// Closes every watch. File operations keep working.
    ///
    /// Returns the number of watches closed.
    pub async fn close_watching(&self) -> usize {
        let closed = self.shared.registry.lock().await.close_all();
        debug!(closed, "Closed watching");
        closed
    }

    /// Closes every watch and forgets the workspace root, the expanded tree
    /// and pending local writes.
    pub async fn close_workspace(&self) {
        let mut registry = self.shared.registry.lock().await;
        registry.close_all();

        let pipeline = &self.shared.pipeline;
        pipeline.resolver.write().clear();
        pipeline.visibility.write().reset();
        pipeline.echo.clear();
        pipeline.forget_directories();

        info!("Workspace closed");
    }

    /// Closes the workspace and stops the dispatch task.
    pub async fn shutdown(&mut self) {
        self.close_workspace().await;
        self.cancellation_token.cancel();

        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                warn!(error = %error, "Dispatch task ended abnormally");
            }
        }
    }

    /// The current workspace root, if one is open.
    #[must_use]
    pub fn working_directory(&self) -> Option<Utf8PathBuf> {
        self.shared
            .pipeline
            .resolver
            .read()
            .root()
            .ok()
            .map(Utf8Path::to_owned)
    }

    /// The expanded directories, root first, in the order they were set.
    #[must_use]
    pub fn expanded_paths(&self) -> Vec<Utf8PathBuf> {
        self.shared.pipeline.visibility.read().expanded().to_vec()
    }

    /// The directories currently watched (absolute, sorted).
    pub async fn watched_directories(&self) -> Vec<Utf8PathBuf> {
        self.shared.registry.lock().await.watched()
    }

    /// Resolves a workspace-relative path to an absolute one.
    pub(crate) fn resolve(&self, relative: &str) -> Result<Utf8PathBuf, SessionError> {
        Ok(self.shared.pipeline.resolver.read().to_absolute(relative)?)
    }

    async fn report_failures(&self, outcome: &ReconcileOutcome) {
        for (dir, error) in outcome.fatal() {
            let path = self.shared.pipeline.resolver.read().to_relative(dir).ok();
            self.shared
                .emitter
                .fatal(FatalWatchError {
                    path,
                    reason: FatalReason::ResourceExhausted,
                    message: error.to_string(),
                })
                .await;
        }
    }
}

impl<B: WatchBackend> Drop for WorkspaceSession<B> {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Drains the raw event channel until cancelled.
async fn dispatch<B: WatchBackend>(
    shared: Arc<Shared<B>>,
    mut event_rx: mpsc::Receiver<WatchSignal>,
    cancellation_token: CancellationToken,
) {
    debug!("Dispatch loop started");

    loop {
        let signal = tokio::select! {
            () = cancellation_token.cancelled() => {
                debug!("Dispatch loop cancelled");
                break;
            }
            signal = event_rx.recv() => match signal {
                Some(signal) => signal,
                None => {
                    debug!("Watch channel closed");
                    break;
                }
            },
        };

        match signal {
            WatchSignal::Event(raw) => {
                if let Some(event) = shared.pipeline.process(raw).await {
                    shared.emitter.emit(event).await;
                }
            }
            WatchSignal::Error { paths, error } => {
                handle_runtime_error(&shared, paths, error).await;
            }
        }
    }

    debug!("Dispatch loop ended");
}

async fn handle_runtime_error<B: WatchBackend>(
    shared: &Arc<Shared<B>>,
    paths: SmallVec<[Utf8PathBuf; 2]>,
    error: WatchError,
) {
    warn!(error = %error, paths = ?paths, "Watch backend reported an error");

    if error.is_fatal() {
        let path = paths
            .first()
            .and_then(|dir| shared.pipeline.resolver.read().to_relative(dir).ok());
        shared
            .emitter
            .fatal(FatalWatchError {
                path,
                reason: FatalReason::ResourceExhausted,
                message: error.to_string(),
            })
            .await;
    }

    if paths.is_empty() {
        return;
    }

    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        let mut registry = shared.registry.lock().await;
        for dir in &paths {
            registry.evict(dir);
        }
    });
}
