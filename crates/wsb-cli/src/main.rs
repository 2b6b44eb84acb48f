//! CLI entry point for wsbridge.
//!
//! `wsbridge` opens a workspace folder, watches the directories a file tree
//! has expanded, and reports changes as JSON lines. Logs go to stderr so
//! stdout stays machine-readable.
//!
//! # Usage
//!
//! ```bash
//! wsbridge [OPTIONS] <COMMAND>
//!
//! # Serve the JSON-lines protocol on stdio
//! wsbridge serve --path /path/to/project
//!
//! # Print changes under the root and two expanded directories
//! wsbridge watch --path /path/to/project --expand src --expand src/lib
//!
//! # Manage recently opened folders
//! wsbridge recent list
//! wsbridge recent remove /path/to/old-project
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod protocol;
mod recent;
mod server;

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wsb_core::Config;
use wsb_session::WorkspaceSession;

use crate::protocol::Outgoing;
use crate::recent::RecentFolders;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Workspace file change notifications over stdio.
///
/// Watches only the directories a file tree has expanded and suppresses the
/// echoes of its own writes.
#[derive(Parser)]
#[command(name = "wsbridge", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    ///
    /// Every section is optional; missing values use defaults.
    #[arg(short, long, global = true, env = "WSBRIDGE_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON-lines protocol on stdin/stdout.
    Serve {
        /// Workspace to open before reading requests.
        #[arg(short, long, env = "WSBRIDGE_PATH")]
        path: Option<Utf8PathBuf>,
    },

    /// Print change notifications for a workspace until interrupted.
    Watch {
        /// Workspace root.
        #[arg(short, long, env = "WSBRIDGE_PATH")]
        path: Utf8PathBuf,

        /// Expanded directory, relative to the root. Repeatable.
        #[arg(short, long = "expand", value_name = "DIR")]
        expand: Vec<String>,
    },

    /// Manage recently opened folders.
    Recent {
        /// What to do with the list.
        #[command(subcommand)]
        action: RecentAction,
    },
}

/// Recent-folder actions.
#[derive(Subcommand)]
enum RecentAction {
    /// Print remembered folders, newest first.
    List,

    /// Forget a folder.
    Remove {
        /// Folder to forget.
        path: Utf8PathBuf,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Output goes to stderr; stdout carries the protocol.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, or defaults when none is given.
fn load_config(path: Option<&Utf8Path>) -> color_eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let config = Config::load(path)
        .map_err(|e| color_eyre::eyre::eyre!("Invalid config {}: {}", path, e))?;
    info!(path = %path, "Loaded configuration");
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Opens `root`, expands `expand`, and prints notifications until Ctrl-C or
/// SIGTERM.
async fn run_watch(config: &Config, root: &Utf8Path, expand: &[String]) -> color_eyre::Result<()> {
    let (mut session, mut stream) = WorkspaceSession::new(config)?;

    let root = session.set_working_directory(root).await?;
    let outcome = session.set_expanded_paths(expand).await?;
    info!(
        root = %root,
        watched = outcome.opened.len() + 1,
        failed = outcome.failed.len(),
        "Watching"
    );

    let shutdown = server::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            notification = stream.recv() => {
                let Some(notification) = notification else {
                    break;
                };
                let line = serde_json::to_string(&Outgoing::from(notification))?;
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                writeln!(handle, "{line}")?;
            }
            () = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

/// Lists or edits the recent-folder store.
fn run_recent(config: &Config, action: &RecentAction) -> color_eyre::Result<()> {
    let mut recent = RecentFolders::open(&config.recent)?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    match action {
        RecentAction::List => {
            for folder in recent.list() {
                writeln!(handle, "{folder}")?;
            }
        }
        RecentAction::Remove { path } => {
            if recent.remove(path)? {
                info!(path = %path, store = %recent.location(), "Forgot folder");
            } else {
                writeln!(handle, "Not in recent folders: {path}")?;
            }
        }
    }

    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load configuration
    let config = load_config(cli.config.as_deref())?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Serve { path } => server::run(&config, path.clone()).await,
        Commands::Watch { path, expand } => run_watch(&config, path, expand).await,
        Commands::Recent { action } => run_recent(&config, action),
    }
}
