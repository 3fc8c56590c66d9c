//! The polymorphic workspace contract.

use crate::error::WorkspaceError;
use crate::settings::{ConfigMap, ConfigValue, ProjectSettings, StackSettings};
use crate::workspace::types::{PluginInfo, StackSummary, WhoAmIResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Client contract for one local execution environment of the provisioning
/// engine: settings persistence, stack configuration, stack lifecycle, and
/// plugin management. [`LocalWorkspace`](crate::LocalWorkspace) is the sole
/// provider today; the trait leaves room for alternate backends (e.g. a
/// remote-backed workspace) without changing callers.
///
/// Stack-scoped config operations select their target stack on the engine
/// immediately before issuing the command. The engine's "currently selected
/// stack" is per working directory, so concurrent stack-scoped operations
/// against one shared workspace instance can race on that selection; callers
/// needing isolation must serialize their own access or use one workspace
/// per stack. Cancellation aborts the pending command or file I/O and yields
/// [`WorkspaceError::Cancelled`], never a partial result.
#[async_trait]
pub trait Workspace: Send + Sync {
    /// Working directory holding the settings files; immutable for the life
    /// of the workspace.
    fn work_dir(&self) -> &Path;

    /// Optional override of the engine's home directory.
    fn pulumi_home(&self) -> Option<&Path>;

    /// Secrets provider applied when this workspace creates stacks.
    fn secrets_provider(&self) -> Option<&str>;

    /// Environment-variable overrides applied to every engine invocation.
    fn env_vars(&self) -> &HashMap<String, String>;

    // --- Settings persistence ---

    /// Project settings from the working directory, or `None` when no
    /// settings file exists in any supported format.
    async fn project_settings(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ProjectSettings>, WorkspaceError>;

    /// Persist project settings, replacing the existing file in full.
    async fn save_project_settings(
        &self,
        settings: &ProjectSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Settings of one stack, or `None` when absent.
    async fn stack_settings(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StackSettings>, WorkspaceError>;

    /// Persist one stack's settings, replacing the existing file in full.
    async fn save_stack_settings(
        &self,
        stack_name: &str,
        settings: &StackSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    // --- Configuration ---

    /// One config value of a stack.
    async fn get_config(
        &self,
        stack_name: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigValue, WorkspaceError>;

    /// Full config of a stack, secrets included in plaintext.
    async fn get_all_config(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigMap, WorkspaceError>;

    /// Set one config value on a stack.
    async fn set_config(
        &self,
        stack_name: &str,
        key: &str,
        value: &ConfigValue,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Set many config values on a stack: one selection, then one engine
    /// command per entry, sequentially. The engine does not tolerate
    /// concurrent mutation of one stack's config.
    async fn set_all_config(
        &self,
        stack_name: &str,
        config: &ConfigMap,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Remove one config key from a stack.
    async fn remove_config(
        &self,
        stack_name: &str,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Remove many config keys: select once, then sequential per-key removes.
    async fn remove_all_config(
        &self,
        stack_name: &str,
        keys: &[String],
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Re-read the stack's config from the engine's backend and return it.
    async fn refresh_config(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<ConfigMap, WorkspaceError>;

    // --- Stack lifecycle ---

    /// Create a new stack, applying the workspace's secrets provider if set.
    async fn create_stack(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Select an existing stack as the engine's current stack.
    async fn select_stack(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Delete a stack without interactive confirmation.
    async fn remove_stack(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// All stacks of the project known to the engine.
    async fn list_stacks(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<StackSummary>, WorkspaceError>;

    // --- Plugins & introspection ---

    /// Install a plugin; `kind` defaults to `resource` when `None`.
    async fn install_plugin(
        &self,
        name: &str,
        version: &str,
        kind: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// Remove installed plugins matching name and version range; `kind`
    /// defaults to `resource` when `None`.
    async fn remove_plugin(
        &self,
        name: Option<&str>,
        version_range: Option<&str>,
        kind: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError>;

    /// All installed plugins.
    async fn list_plugins(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PluginInfo>, WorkspaceError>;

    /// Identity of the signed-in engine user.
    async fn who_am_i(&self, cancel: &CancellationToken)
        -> Result<WhoAmIResult, WorkspaceError>;

    /// Version string of the engine binary, without any leading `v`.
    async fn pulumi_version(
        &self,
        cancel: &CancellationToken,
    ) -> Result<String, WorkspaceError>;
}
