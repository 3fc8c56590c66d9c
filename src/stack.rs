//! Stack helpers: compose workspace construction with a stack-level
//! operation and hand back a stack-scoped handle.

use crate::error::WorkspaceError;
use crate::settings::{ConfigMap, ConfigValue, StackSettings};
use crate::workspace::{LocalWorkspace, LocalWorkspaceOptions, Workspace};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Construct a local workspace and create `stack_name` in it.
pub async fn create_stack(
    stack_name: &str,
    options: LocalWorkspaceOptions,
    cancel: &CancellationToken,
) -> Result<Stack, WorkspaceError> {
    let workspace = LocalWorkspace::new(options, cancel).await?;
    Stack::create(stack_name, workspace, cancel).await
}

/// Construct a local workspace and select the existing `stack_name`.
pub async fn select_stack(
    stack_name: &str,
    options: LocalWorkspaceOptions,
    cancel: &CancellationToken,
) -> Result<Stack, WorkspaceError> {
    let workspace = LocalWorkspace::new(options, cancel).await?;
    Stack::select(stack_name, workspace, cancel).await
}

/// Construct a local workspace and create `stack_name`, falling back to
/// selection when the engine reports it already exists.
pub async fn create_or_select_stack(
    stack_name: &str,
    options: LocalWorkspaceOptions,
    cancel: &CancellationToken,
) -> Result<Stack, WorkspaceError> {
    let workspace = LocalWorkspace::new(options, cancel).await?;
    Stack::create_or_select(stack_name, workspace, cancel).await
}

/// Handle to one named stack. Owns its workspace, so dropping the handle
/// releases an owned working directory; config and settings operations are
/// scoped to the handle's stack name.
#[derive(Debug)]
pub struct Stack {
    name: String,
    workspace: LocalWorkspace,
}

impl Stack {
    /// Create `stack_name` in `workspace` and wrap it.
    pub async fn create(
        stack_name: &str,
        workspace: LocalWorkspace,
        cancel: &CancellationToken,
    ) -> Result<Self, WorkspaceError> {
        workspace.create_stack(stack_name, cancel).await?;
        Ok(Self {
            name: stack_name.to_string(),
            workspace,
        })
    }

    /// Select the existing `stack_name` in `workspace` and wrap it.
    pub async fn select(
        stack_name: &str,
        workspace: LocalWorkspace,
        cancel: &CancellationToken,
    ) -> Result<Self, WorkspaceError> {
        workspace.select_stack(stack_name, cancel).await?;
        Ok(Self {
            name: stack_name.to_string(),
            workspace,
        })
    }

    /// Create `stack_name`, or select it when it already exists.
    pub async fn create_or_select(
        stack_name: &str,
        workspace: LocalWorkspace,
        cancel: &CancellationToken,
    ) -> Result<Self, WorkspaceError> {
        match workspace.create_stack(stack_name, cancel).await {
            Ok(()) => {}
            Err(e) if e.is_already_exists() => {
                debug!("stack {} already exists, selecting it", stack_name);
                workspace.select_stack(stack_name, cancel).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(Self {
            name: stack_name.to_string(),
            workspace,
        })
    }

    /// Full stack name this handle is scoped to.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning workspace, for project-level operations.
    pub fn workspace(&self) -> &LocalWorkspace {
        &self.workspace
    }

    /// This stack's persisted settings, if any.
    pub async fn settings(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<StackSettings>, WorkspaceError> {
        self.workspace.stack_settings(&self.name, cancel).await
    }

    /// Persist this stack's settings, replacing the file in full.
    pub async fn save_settings(
        &self,
        settings: &StackSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.workspace
            .save_stack_settings(&self.name, settings, cancel)
            .await
    }

    /// One config value of this stack.
    pub async fn get_config(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigValue, WorkspaceError> {
        self.workspace.get_config(&self.name, key, cancel).await
    }

    /// Full config of this stack, secrets included.
    pub async fn get_all_config(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ConfigMap, WorkspaceError> {
        self.workspace.get_all_config(&self.name, cancel).await
    }

    /// Set one config value on this stack.
    pub async fn set_config(
        &self,
        key: &str,
        value: &ConfigValue,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.workspace
            .set_config(&self.name, key, value, cancel)
            .await
    }

    /// Set many config values, sequentially after one selection.
    pub async fn set_all_config(
        &self,
        config: &ConfigMap,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.workspace
            .set_all_config(&self.name, config, cancel)
            .await
    }

    /// Remove one config key from this stack.
    pub async fn remove_config(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.workspace.remove_config(&self.name, key, cancel).await
    }

    /// Remove many config keys, sequentially after one selection.
    pub async fn remove_all_config(
        &self,
        keys: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.workspace
            .remove_all_config(&self.name, keys, cancel)
            .await
    }

    /// Re-read this stack's config from the backend and return it.
    pub async fn refresh_config(
        &self,
        cancel: &CancellationToken,
    ) -> Result<ConfigMap, WorkspaceError> {
        self.workspace.refresh_config(&self.name, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{CommandResult, CommandRunner};
    use crate::error::CommandError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    /// Runner double that fails `stack init` with a canned stderr and
    /// records everything else as successful.
    struct InitFailsRunner {
        stderr: String,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl InitFailsRunner {
        fn new(stderr: &str) -> Self {
            Self {
                stderr: stderr.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CommandRunner for InitFailsRunner {
        async fn run(
            &self,
            args: &[String],
            _cwd: &Path,
            _env: &HashMap<String, String>,
            _cancel: &CancellationToken,
        ) -> Result<CommandResult, WorkspaceError> {
            self.calls.lock().unwrap().push(args.to_vec());
            if args.first().map(String::as_str) == Some("stack")
                && args.get(1).map(String::as_str) == Some("init")
            {
                return Err(CommandError {
                    args: args.to_vec(),
                    code: Some(255),
                    stdout: String::new(),
                    stderr: self.stderr.clone(),
                }
                .into());
            }
            Ok(CommandResult {
                stdout: String::new(),
                stderr: String::new(),
                code: 0,
            })
        }
    }

    async fn workspace_with(runner: Arc<dyn CommandRunner>) -> LocalWorkspace {
        LocalWorkspace::with_runner(LocalWorkspaceOptions::default(), runner, &cancel())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_or_select_falls_back_to_select() {
        let runner = Arc::new(InitFailsRunner::new("error: stack 'dev' already exists"));
        let ws = workspace_with(runner.clone()).await;

        let stack = Stack::create_or_select("dev", ws, &cancel()).await.unwrap();
        assert_eq!(stack.name(), "dev");

        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(calls[0], vec!["stack", "init", "dev"]);
        assert_eq!(calls[1], vec!["stack", "select", "dev"]);
    }

    #[tokio::test]
    async fn test_create_or_select_surfaces_other_failures() {
        let runner = Arc::new(InitFailsRunner::new("error: backend unreachable"));
        let ws = workspace_with(runner).await;

        let err = Stack::create_or_select("dev", ws, &cancel())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Command(_)));
    }

    #[tokio::test]
    async fn test_select_issues_only_a_select() {
        let runner = Arc::new(InitFailsRunner::new("unused"));
        let ws = workspace_with(runner.clone()).await;

        let stack = Stack::select("org/proj/dev", ws, &cancel()).await.unwrap();
        assert_eq!(stack.name(), "org/proj/dev");
        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![vec!["stack", "select", "org/proj/dev"]]);
    }

    #[tokio::test]
    async fn test_stack_config_ops_use_own_name() {
        let runner = Arc::new(InitFailsRunner::new("unused"));
        let ws = workspace_with(runner.clone()).await;
        let stack = Stack::select("dev", ws, &cancel()).await.unwrap();

        stack
            .set_config("region", &ConfigValue::plain("us-east-1"), &cancel())
            .await
            .unwrap();

        let calls = runner.calls.lock().unwrap().clone();
        assert_eq!(calls[1], vec!["stack", "select", "dev"]);
        assert_eq!(
            calls[2],
            vec!["config", "set", "region", "us-east-1", "--plaintext"]
        );
    }

    #[tokio::test]
    async fn test_stack_settings_round_trip_scoped_to_name() {
        let runner = Arc::new(InitFailsRunner::new("unused"));
        let ws = workspace_with(runner).await;
        let stack = Stack::select("org/proj/dev", ws, &cancel()).await.unwrap();

        let settings = StackSettings {
            secrets_provider: Some("passphrase".to_string()),
            ..Default::default()
        };
        stack.save_settings(&settings, &cancel()).await.unwrap();
        assert!(stack.workspace().work_dir().join("Pulumi.dev.yaml").exists());
        assert_eq!(stack.settings(&cancel()).await.unwrap(), Some(settings));
    }
}
