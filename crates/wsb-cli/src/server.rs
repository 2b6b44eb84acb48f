//! The stdio server behind `wsbridge serve`.
//!
//! Requests are read from stdin one line at a time and handled in order.
//! Session notifications are forwarded as they arrive, interleaved with
//! responses. A single writer task owns stdout so lines never tear.
//!
//! ```text
//! stdin ──► dispatch_line ──┐
//!                           ├──► writer task ──► stdout
//! NotificationStream ──► pump
//! ```

use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wsb_core::{Config, ConfigError};
use wsb_session::{NotificationStream, SessionError, WatchBackend, WorkspaceSession};

use crate::protocol::{Call, Outgoing, Request, parse_request};
use crate::recent::RecentFolders;

/// A failed call. Its message becomes the `error` response.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The session rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The recent-folder store could not be updated.
    #[error(transparent)]
    Recent(#[from] ConfigError),

    /// The result could not be encoded.
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),

    /// The process's current directory is unavailable.
    #[error("failed to read the current directory: {0}")]
    CurrentDir(std::io::Error),
}

/// Handles protocol calls against one workspace session.
#[derive(Debug)]
pub struct Server<B: WatchBackend> {
    session: WorkspaceSession<B>,
    recent: RecentFolders,
}

impl<B: WatchBackend> Server<B> {
    /// Creates a server over `session`, remembering opened workspaces in
    /// `recent`.
    pub fn new(session: WorkspaceSession<B>, recent: RecentFolders) -> Self {
        Self { session, recent }
    }

    /// Parses and handles one request line.
    ///
    /// Returns the reply and whether the server should stop.
    pub async fn dispatch_line(&mut self, line: &str) -> (Outgoing, bool) {
        match parse_request(line) {
            Ok(request) => self.dispatch(request).await,
            Err(error) => {
                warn!(error = %error, "Rejected request");
                (error.into(), false)
            }
        }
    }

    /// Handles a parsed request.
    pub async fn dispatch(&mut self, request: Request) -> (Outgoing, bool) {
        let Request { id, call } = request;
        let stop = matches!(call, Call::Shutdown);

        match self.handle(call).await {
            Ok(result) => (Outgoing::Response { id, result }, stop),
            Err(error) => {
                debug!(id, error = %error, "Call failed");
                (
                    Outgoing::Error {
                        id,
                        message: error.to_string(),
                    },
                    false,
                )
            }
        }
    }

    /// Runs one call and encodes its result.
    pub async fn handle(&mut self, call: Call) -> Result<Value, CallError> {
        let session = &self.session;

        match call {
            Call::SetWorkingDirectory { path } => {
                let root = session.set_working_directory(&path).await?;
                if let Err(error) = self.recent.add(&root) {
                    warn!(root = %root, error = %error, "Failed to remember workspace");
                }
                encode(root)
            }
            Call::SetExpandedPaths { paths } => {
                let outcome = session.set_expanded_paths(&paths).await?;
                let failed: Vec<&Utf8PathBuf> = outcome.failed.iter().map(|(dir, _)| dir).collect();
                Ok(serde_json::json!({
                    "opened": outcome.opened,
                    "closed": outcome.closed,
                    "failed": failed,
                }))
            }
            Call::ListDirectory { path } => encode(session.list_directory(&path).await?),
            Call::ReadFile { path, options } => encode(session.read_file(&path, options).await?),
            Call::WriteFile {
                path,
                content,
                options,
            } => {
                session
                    .write_file(&path, content.as_bytes(), options)
                    .await?;
                Ok(Value::Null)
            }
            Call::MakeDirectory { path } => {
                session.make_directory(&path).await?;
                Ok(Value::Null)
            }
            Call::RemoveDirectory { path } => {
                session.remove_directory(&path).await?;
                Ok(Value::Null)
            }
            Call::RemoveFile { path } => {
                session.remove_file(&path).await?;
                Ok(Value::Null)
            }
            Call::Rename { from, to } => {
                session.rename(&from, &to).await?;
                Ok(Value::Null)
            }
            Call::Stat { path } => encode(session.stat(&path).await?),
            Call::Lstat { path } => encode(session.lstat(&path).await?),
            Call::PathExists { path } => Ok(Value::Bool(session.path_exists(&path).await?)),
            Call::CloseWatching => Ok(Value::from(session.close_watching().await)),
            Call::CloseWorkspace | Call::Shutdown => {
                session.close_workspace().await;
                Ok(Value::Null)
            }
            Call::WorkingDirectory => encode(session.working_directory()),
            Call::ExpandedPaths => encode(session.expanded_paths()),
            Call::WatchedDirectories => encode(session.watched_directories().await),
            Call::GetRecentFolders => encode(self.recent.list()),
            Call::RemoveRecentFolder { path } => Ok(Value::Bool(self.recent.remove(&path)?)),
            Call::CurrentPath => {
                let cwd = std::env::current_dir().map_err(CallError::CurrentDir)?;
                encode(cwd)
            }
        }
    }

    /// Closes the workspace and stops the session's dispatch task.
    pub async fn shutdown(&mut self) {
        self.session.shutdown().await;
    }
}

fn encode(value: impl Serialize) -> Result<Value, CallError> {
    Ok(serde_json::to_value(value)?)
}

// =============================================================================
// STDIO LOOP
// =============================================================================

/// Serves the protocol on stdio until stdin closes, a `shutdown` request
/// arrives, or the process is signalled.
///
/// If `initial` is given it is opened before the first request is read.
pub async fn run(config: &Config, initial: Option<Utf8PathBuf>) -> color_eyre::Result<()> {
    let (session, stream) = WorkspaceSession::new(config)?;

    let mut recent = RecentFolders::open(&config.recent)?;
    if let Err(error) = recent.prune_missing() {
        warn!(error = %error, "Failed to prune recent folders");
    }

    let mut server = Server::new(session, recent);

    let (out_tx, out_rx) = mpsc::channel::<Outgoing>(config.session.notification_capacity);
    let writer = tokio::spawn(write_lines(tokio::io::stdout(), out_rx));
    let pump = tokio::spawn(pump_notifications(stream, out_tx.clone()));

    if let Some(path) = initial {
        let (reply, _) = server
            .dispatch(Request {
                id: None,
                call: Call::SetWorkingDirectory { path },
            })
            .await;
        if matches!(reply, Outgoing::Error { .. }) {
            // No workspace is open; say why.
            if out_tx.send(reply).await.is_err() {
                debug!("Writer gone, dropping initial open error");
            }
        }
    }

    info!("Serving on stdio");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed, shutting down");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let (reply, stop) = server.dispatch_line(&line).await;
                if out_tx.send(reply).await.is_err() || stop {
                    break;
                }
            }
            () = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    server.shutdown().await;
    drop(server);

    // The stream ends once the session is gone; the writer once every sender is.
    pump.await?;
    drop(out_tx);
    writer.await??;

    Ok(())
}

/// Forwards session notifications to the writer.
async fn pump_notifications(mut stream: NotificationStream, out: mpsc::Sender<Outgoing>) {
    while let Some(notification) = stream.recv().await {
        if out.send(notification.into()).await.is_err() {
            debug!("Writer gone, dropping notifications");
            break;
        }
    }
}

/// Writes each message as one JSON line.
async fn write_lines<W>(mut out: W, mut messages: mpsc::Receiver<Outgoing>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = messages.recv().await {
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    () = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                warn!(error = %error, "Failed to listen for SIGTERM");
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }
}
