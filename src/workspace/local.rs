//! Local workspace: the concrete provider backed by a working directory on
//! this machine and the `pulumi` binary.

use crate::cmd::{CommandResult, CommandRunner, PulumiCli};
use crate::error::WorkspaceError;
use crate::settings::{ConfigMap, ConfigValue, ProjectSettings, StackSettings};
use crate::store::SettingsStore;
use crate::workspace::contract::Workspace;
use crate::workspace::types::{PluginInfo, StackSummary, WhoAmIResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Plugin kind assumed when an operation does not name one.
const DEFAULT_PLUGIN_KIND: &str = "resource";

/// In-process provisioning program attached to a workspace. The program is
/// carried as workspace identity and handed to higher layers that drive
/// deployments; this client never invokes it itself.
pub type ProgramFn = Arc<dyn Fn() -> Result<(), WorkspaceError> + Send + Sync>;

/// Options recognized by [`LocalWorkspace`] construction. All fields are
/// optional; a missing `work_dir` makes the workspace create and own a
/// temporary directory.
#[derive(Clone, Default)]
pub struct LocalWorkspaceOptions {
    /// Working directory; generated (and owned) when absent.
    pub work_dir: Option<PathBuf>,
    /// Override of the engine's home directory, exported as `PULUMI_HOME`.
    pub pulumi_home: Option<PathBuf>,
    /// In-process program reference; requires `project_settings`.
    pub program: Option<ProgramFn>,
    /// Secrets provider applied when creating stacks.
    pub secrets_provider: Option<String>,
    /// Environment overrides applied to every engine invocation.
    pub env_vars: HashMap<String, String>,
    /// Project settings persisted during construction.
    pub project_settings: Option<ProjectSettings>,
    /// Stack settings persisted during construction, keyed by stack name
    /// (bare or fully qualified).
    pub stack_settings: HashMap<String, StackSettings>,
}

impl fmt::Debug for LocalWorkspaceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWorkspaceOptions")
            .field("work_dir", &self.work_dir)
            .field("pulumi_home", &self.pulumi_home)
            .field("program", &self.program.as_ref().map(|_| "<fn>"))
            .field("secrets_provider", &self.secrets_provider)
            .field("env_vars", &self.env_vars)
            .field("project_settings", &self.project_settings)
            .field("stack_settings", &self.stack_settings)
            .finish()
    }
}

/// Workspace provider backed by a local working directory and the CLI.
///
/// Obtainable only through the async factories, which persist any supplied
/// settings concurrently and return once every write has landed; a handle you
/// hold is always ready. Dropping the workspace best-effort deletes the
/// working directory if the workspace created it.
pub struct LocalWorkspace {
    work_dir: PathBuf,
    /// True iff the working directory was auto-created; governs cleanup.
    owned: bool,
    pulumi_home: Option<PathBuf>,
    program: Option<ProgramFn>,
    secrets_provider: Option<String>,
    env_vars: HashMap<String, String>,
    store: SettingsStore,
    runner: Arc<dyn CommandRunner>,
}

impl fmt::Debug for LocalWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWorkspace")
            .field("work_dir", &self.work_dir)
            .field("owned", &self.owned)
            .field("pulumi_home", &self.pulumi_home)
            .field("secrets_provider", &self.secrets_provider)
            .finish()
    }
}

impl LocalWorkspace {
    /// Create a workspace driving the `pulumi` binary from PATH.
    pub async fn new(
        options: LocalWorkspaceOptions,
        cancel: &CancellationToken,
    ) -> Result<Self, WorkspaceError> {
        Self::with_runner(options, Arc::new(PulumiCli::new()), cancel).await
    }

    /// Create a workspace over a caller-supplied command runner. This is the
    /// seam for alternate binaries and for test doubles.
    pub async fn with_runner(
        options: LocalWorkspaceOptions,
        runner: Arc<dyn CommandRunner>,
        cancel: &CancellationToken,
    ) -> Result<Self, WorkspaceError> {
        // Fail fast, before any filesystem work.
        if options.program.is_some() && options.project_settings.is_none() {
            return Err(WorkspaceError::Validation(
                "an inline program requires project_settings".to_string(),
            ));
        }

        // Directory resolution is synchronous; the resolved path is immutable
        // for the lifetime of the instance.
        let (work_dir, owned) = match options.work_dir {
            Some(dir) => (dir, false),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("pulumi-workspace-")
                    .tempdir()
                    .map_err(|e| WorkspaceError::io(std::env::temp_dir(), e))?
                    .into_path();
                debug!("created owned working directory {}", dir.display());
                (dir, true)
            }
        };

        let store = SettingsStore::new(&work_dir);
        let workspace = Self {
            work_dir,
            owned,
            pulumi_home: options.pulumi_home,
            program: options.program,
            secrets_provider: options.secrets_provider,
            env_vars: options.env_vars,
            store,
            runner,
        };

        // Settings writes run as independent concurrent tasks; joining them
        // here is the readiness barrier. Any failure fails the factory (and
        // drops the workspace, cleaning up an owned directory).
        let mut writes = Vec::new();
        if let Some(project) = options.project_settings {
            let store = workspace.store.clone();
            let token = cancel.clone();
            writes.push(tokio::spawn(async move {
                store.save_project_settings(&project, &token).await
            }));
        }
        for (stack_name, settings) in options.stack_settings {
            let store = workspace.store.clone();
            let token = cancel.clone();
            writes.push(tokio::spawn(async move {
                store
                    .save_stack_settings(&stack_name, &settings, &token)
                    .await
            }));
        }
        for result in futures::future::try_join_all(writes).await? {
            result?;
        }

        Ok(workspace)
    }

    /// In-process program attached to this workspace, if any.
    pub fn program(&self) -> Option<&ProgramFn> {
        self.program.as_ref()
    }

    /// True iff this workspace created (and will delete) its directory.
    pub fn owns_work_dir(&self) -> bool {
        self.owned
    }

    fn command_env(&self) -> HashMap<String, String> {
        let mut env = self.env_vars.clone();
        if let Some(home) = &self.pulumi_home {
            env.insert("PULUMI_HOME".to_string(), home.display().to_string());
        }
        env
    }

    async fn run(
        &self,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<CommandResult, WorkspaceError> {
        self.runner
            .run(&args, &self.work_dir, &self.command_env(), cancel)
            .await
    }

    /// Select `stack_name` and then run `args`. The selection must
    /// immediately precede the command it targets; see the trait docs for
    /// the shared-instance hazard.
    async fn run_for_stack(
        &self,
        stack_name: &str,
        args: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<CommandResult, WorkspaceError> {
        self.select_stack(stack_name, cancel).await?;
        self.run(args, cancel).await
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl Workspace for LocalWorkspace {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn pulumi_home(&self) -> Option<&Path> {
        self.pulumi_home.as_deref()
    }

    fn secrets_provider(&self) -> Option<&str> {
        self.secrets_provider.as_deref()
    }

    fn env_vars(&self) -> &HashMap<String, String> {
        &self.env_vars
    }

    async fn project_settings(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ProjectSettings>, WorkspaceError> {
        self.store.project_settings(cancel).await
    }

    async fn save_project_settings(
        &self,
        settings: &ProjectSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.store.save_project_settings(settings, cancel).await
    }

    async fn stack_settings(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StackSettings>, WorkspaceError> {
        self.store.stack_settings(stack_name, cancel).await
    }

    async fn save_stack_settings(
        &self,
        stack_name: &str,
        settings: &StackSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.store
            .save_stack_settings(stack_name, settings, cancel)
            .await
    }

    async fn get_config(
        &self,
        stack_name: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigValue, WorkspaceError> {
        let result = self
            .run_for_stack(stack_name, argv(&["config", "get", key, "--json"]), cancel)
            .await?;
        Ok(serde_json::from_str(&result.stdout)?)
    }

    async fn get_all_config(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigMap, WorkspaceError> {
        let result = self
            .run_for_stack(
                stack_name,
                argv(&["config", "--show-secrets", "--json"]),
                cancel,
            )
            .await?;
        Ok(serde_json::from_str(&result.stdout)?)
    }

    async fn set_config(
        &self,
        stack_name: &str,
        key: &str,
        value: &ConfigValue,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        let secrecy = if value.secret { "--secret" } else { "--plaintext" };
        self.run_for_stack(
            stack_name,
            argv(&["config", "set", key, &value.value, secrecy]),
            cancel,
        )
        .await?;
        Ok(())
    }

    async fn set_all_config(
        &self,
        stack_name: &str,
        config: &ConfigMap,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.select_stack(stack_name, cancel).await?;
        // Strictly sequential: the engine cannot safely apply concurrent
        // mutations to one stack's config.
        for (key, value) in config {
            let secrecy = if value.secret { "--secret" } else { "--plaintext" };
            self.run(argv(&["config", "set", key, &value.value, secrecy]), cancel)
                .await?;
        }
        Ok(())
    }

    async fn remove_config(
        &self,
        stack_name: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.run_for_stack(stack_name, argv(&["config", "rm", key]), cancel)
            .await?;
        Ok(())
    }

    async fn remove_all_config(
        &self,
        stack_name: &str,
        keys: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.select_stack(stack_name, cancel).await?;
        for key in keys {
            self.run(argv(&["config", "rm", key]), cancel).await?;
        }
        Ok(())
    }

    async fn refresh_config(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigMap, WorkspaceError> {
        self.run_for_stack(stack_name, argv(&["config", "refresh", "--force"]), cancel)
            .await?;
        self.get_all_config(stack_name, cancel).await
    }

    async fn create_stack(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        debug!("creating stack {}", stack_name);
        let mut args = argv(&["stack", "init", stack_name]);
        if let Some(provider) = &self.secrets_provider {
            args.push("--secrets-provider".to_string());
            args.push(provider.clone());
        }
        self.run(args, cancel).await?;
        Ok(())
    }

    async fn select_stack(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        debug!("selecting stack {}", stack_name);
        self.run(argv(&["stack", "select", stack_name]), cancel)
            .await?;
        Ok(())
    }

    async fn remove_stack(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        debug!("removing stack {}", stack_name);
        self.run(argv(&["stack", "rm", "--yes", stack_name]), cancel)
            .await?;
        Ok(())
    }

    async fn list_stacks(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StackSummary>, WorkspaceError> {
        let result = self.run(argv(&["stack", "ls", "--json"]), cancel).await?;
        Ok(serde_json::from_str(&result.stdout)?)
    }

    async fn install_plugin(
        &self,
        name: &str,
        version: &str,
        kind: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        let kind = kind.unwrap_or(DEFAULT_PLUGIN_KIND);
        self.run(argv(&["plugin", "install", kind, name, version]), cancel)
            .await?;
        Ok(())
    }

    async fn remove_plugin(
        &self,
        name: Option<&str>,
        version_range: Option<&str>,
        kind: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        let mut args = argv(&["plugin", "rm", kind.unwrap_or(DEFAULT_PLUGIN_KIND)]);
        if let Some(name) = name {
            args.push(name.to_string());
        }
        if let Some(range) = version_range {
            args.push(range.to_string());
        }
        args.push("--yes".to_string());
        self.run(args, cancel).await?;
        Ok(())
    }

    async fn list_plugins(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PluginInfo>, WorkspaceError> {
        let result = self.run(argv(&["plugin", "ls", "--json"]), cancel).await?;
        Ok(serde_json::from_str(&result.stdout)?)
    }

    async fn who_am_i(
        &self,
        cancel: &CancellationToken,
    ) -> Result<WhoAmIResult, WorkspaceError> {
        let result = self.run(argv(&["whoami"]), cancel).await?;
        Ok(WhoAmIResult {
            user: result.stdout.trim().to_string(),
        })
    }

    async fn pulumi_version(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, WorkspaceError> {
        let result = self.run(argv(&["version"]), cancel).await?;
        Ok(result.stdout.trim().trim_start_matches('v').to_string())
    }
}

impl Drop for LocalWorkspace {
    /// Best-effort release of an owned working directory. Deletion failures
    /// are absorbed; the host's own temp cleanup is the fallback.
    fn drop(&mut self) {
        if self.owned && self.work_dir.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.work_dir) {
                warn!(
                    "failed to remove owned working directory {}: {}",
                    self.work_dir.display(),
                    e
                );
            }
        }
    }
}
