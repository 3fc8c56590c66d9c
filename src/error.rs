//! Crate-wide error type for workspace, settings, and CLI operations.

use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a non-zero exit of the Pulumi CLI. Carries the captured
/// output unmodified so callers can inspect what the engine reported.
#[derive(Debug, Error)]
pub struct CommandError {
    /// Argument vector passed to the CLI (without the binary name).
    pub args: Vec<String>,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command `pulumi {}` failed with ", self.args.join(" "))?;
        match self.code {
            Some(code) => write!(f, "exit code {code}")?,
            None => write!(f, "no exit code (killed by signal)")?,
        }
        write!(f, ": {}", self.stderr)
    }
}

impl CommandError {
    /// True when the CLI reported that the target stack already exists.
    /// Used by the create-or-select flow to fall back to selection.
    pub fn is_already_exists(&self) -> bool {
        self.stderr.contains("already exists")
    }

    /// True when the CLI reported that no stack with the given name exists.
    pub fn is_not_found(&self) -> bool {
        self.stderr.contains("no stack named")
    }
}

/// Errors surfaced by workspace operations.
///
/// A missing settings file is not represented here: absence is a normal
/// `Ok(None)` outcome of the settings store, not an error.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Invalid or missing construction arguments; raised before any I/O.
    #[error("invalid workspace arguments: {0}")]
    Validation(String),

    /// Filesystem failure, with the path involved.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to spawn the Pulumi CLI process itself.
    #[error("failed to spawn pulumi: {0}")]
    Spawn(#[source] std::io::Error),

    /// The CLI ran but exited non-zero.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Malformed YAML from a settings file.
    #[error("yaml decode/encode failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed JSON from a settings file or a command's stdout.
    #[error("json decode/encode failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A construction-time settings write task panicked or was aborted.
    #[error("settings write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

impl WorkspaceError {
    /// Shorthand for building an [`WorkspaceError::Io`] with path context.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkspaceError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when this error is a CLI failure reporting an existing stack.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, WorkspaceError::Command(e) if e.is_already_exists())
    }

    /// True when this error is a CLI failure reporting a missing stack.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WorkspaceError::Command(e) if e.is_not_found())
    }
}
