//! The JSON-lines wire protocol spoken on stdio by `wsbridge serve`.
//!
//! Each line on stdin is one request:
//!
//! ```text
//! {"id":1,"method":"setWorkingDirectory","params":{"path":"/home/me/project"}}
//! {"id":2,"method":"setExpandedPaths","params":{"paths":["src","src/lib"]}}
//! {"id":3,"method":"closeWatching"}
//! ```
//!
//! Each line on stdout is one [`Outgoing`] message: a response to a request,
//! an error, or a notification from the workspace session.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wsb_session::{FileContent, Notification, ReadOptions, WriteOptions};

// =============================================================================
// REQUESTS
// =============================================================================

/// A parsed request line.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlates the response with the request. Optional.
    pub id: Option<u64>,

    /// What to do.
    pub call: Call,
}

/// Every method the server understands, with its parameters.
///
/// Paths are workspace-relative unless noted.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "camelCase")]
pub enum Call {
    /// Opens a workspace. `path` is absolute.
    SetWorkingDirectory {
        /// Absolute directory to open.
        path: Utf8PathBuf,
    },
    /// Replaces the expanded directory set.
    SetExpandedPaths {
        /// Expanded directories.
        paths: Vec<String>,
    },
    /// Lists a directory.
    ListDirectory {
        /// Directory to list.
        path: String,
    },
    /// Reads a file.
    ReadFile {
        /// File to read.
        path: String,
        /// Text or bytes.
        #[serde(default)]
        options: ReadOptions,
    },
    /// Writes a file.
    WriteFile {
        /// File to write.
        path: String,
        /// A string, or an array of bytes.
        content: FileContent,
        /// Write options.
        #[serde(default)]
        options: WriteOptions,
    },
    /// Creates a directory.
    MakeDirectory {
        /// Directory to create.
        path: String,
    },
    /// Removes a directory and everything below it.
    RemoveDirectory {
        /// Directory to remove.
        path: String,
    },
    /// Removes a file.
    RemoveFile {
        /// File to remove.
        path: String,
    },
    /// Renames a file or directory.
    Rename {
        /// Current path.
        from: String,
        /// New path.
        to: String,
    },
    /// Stats a path, following symlinks.
    Stat {
        /// Path to stat.
        path: String,
    },
    /// Stats a path without following symlinks.
    Lstat {
        /// Path to stat.
        path: String,
    },
    /// Checks whether a path exists.
    PathExists {
        /// Path to check.
        path: String,
    },
    /// Closes every watch.
    CloseWatching,
    /// Closes the workspace.
    CloseWorkspace,
    /// The open workspace root.
    WorkingDirectory,
    /// The expanded directory set.
    ExpandedPaths,
    /// The directories currently watched.
    WatchedDirectories,
    /// The recently opened workspaces.
    GetRecentFolders,
    /// Forgets a recently opened workspace. `path` is absolute.
    RemoveRecentFolder {
        /// Folder to forget.
        path: Utf8PathBuf,
    },
    /// The server process's current directory.
    CurrentPath,
    /// Closes the workspace and ends the server.
    Shutdown,
}

/// A request line that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProtocolError {
    /// The request id, if one could be recovered.
    pub id: Option<u64>,

    /// What was wrong with the line.
    pub message: String,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<u64>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// Parses one request line.
///
/// Parameters may be omitted, or given as `null` or `{}`, for methods that
/// take none.
pub fn parse_request(line: &str) -> Result<Request, ProtocolError> {
    let value: Value = serde_json::from_str(line).map_err(|e| ProtocolError {
        id: None,
        message: format!("invalid JSON: {e}"),
    })?;

    // Recover the id early so even a malformed request gets a correlated error.
    let id = value.get("id").and_then(Value::as_u64);

    let envelope: Envelope = serde_json::from_value(value).map_err(|e| ProtocolError {
        id,
        message: format!("invalid request: {e}"),
    })?;

    let mut tagged = serde_json::Map::new();
    tagged.insert("method".to_owned(), Value::String(envelope.method.clone()));
    if !is_empty_params(&envelope.params) {
        tagged.insert("params".to_owned(), envelope.params);
    }

    let call = serde_json::from_value(Value::Object(tagged)).map_err(|e| ProtocolError {
        id: envelope.id,
        message: format!("invalid call to '{}': {e}", envelope.method),
    })?;

    Ok(Request {
        id: envelope.id,
        call,
    })
}

fn is_empty_params(params: &Value) -> bool {
    match params {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

// =============================================================================
// OUTGOING MESSAGES
// =============================================================================

/// One line written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outgoing {
    /// A request succeeded.
    Response {
        /// The request id.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        /// Method-specific result; `null` when there is nothing to return.
        result: Value,
    },

    /// A request failed or could not be parsed.
    Error {
        /// The request id, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
        /// Human-readable cause.
        message: String,
    },

    /// Something happened in the workspace.
    Notification {
        /// The session notification.
        notification: Notification,
    },
}

impl From<ProtocolError> for Outgoing {
    fn from(error: ProtocolError) -> Self {
        Self::Error {
            id: error.id,
            message: error.message,
        }
    }
}

impl From<Notification> for Outgoing {
    fn from(notification: Notification) -> Self {
        Self::Notification { notification }
    }
}
