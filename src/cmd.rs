//! Pulumi CLI invocation: the command runner seam and its process-backed impl.
//!
//! Every engine interaction goes through [`CommandRunner`], which keeps the
//! workspace testable against a recording double and leaves room for an
//! alternate transport without touching callers.

use crate::error::{CommandError, WorkspaceError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Captured output of one CLI invocation that exited successfully.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

/// Executes the engine binary with an argument vector and environment,
/// returning captured output or a process-level error.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the engine with `args` in `cwd`, applying `env` on top of the
    /// inherited environment. A non-zero exit is an error carrying the
    /// captured stdout/stderr; cancellation kills the process promptly.
    async fn run(
        &self,
        args: &[String],
        cwd: &Path,
        env: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<CommandResult, WorkspaceError>;
}

/// Process-backed runner invoking the `pulumi` binary.
#[derive(Debug, Clone)]
pub struct PulumiCli {
    bin: PathBuf,
}

impl PulumiCli {
    /// Runner resolving `pulumi` from PATH.
    pub fn new() -> Self {
        Self {
            bin: PathBuf::from("pulumi"),
        }
    }

    /// Runner invoking a specific binary path.
    pub fn with_binary(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for PulumiCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for PulumiCli {
    async fn run(
        &self,
        args: &[String],
        cwd: &Path,
        env: &HashMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<CommandResult, WorkspaceError> {
        debug!("running pulumi {} in {}", args.join(" "), cwd.display());

        let mut command = Command::new(&self.bin);
        command
            .args(args)
            .current_dir(cwd)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future (on cancellation) must not leave an
            // orphaned engine process behind.
            .kill_on_drop(true);

        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(WorkspaceError::Cancelled),
            result = command.output() => result.map_err(WorkspaceError::Spawn)?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(CommandResult {
                stdout,
                stderr,
                // success() implies a real exit code on every platform we run on
                code: output.status.code().unwrap_or(0),
            })
        } else {
            Err(CommandError {
                args: args.to_vec(),
                code: output.status.code(),
                stdout,
                stderr,
            }
            .into())
        }
    }
}
