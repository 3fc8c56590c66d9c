//! Pulumi Workspace: Programmatic Local Workspace Client
//!
//! Drives a local execution environment for the Pulumi CLI, letting programs
//! create, configure, and manage stacks without invoking the interactive tool
//! by hand. A workspace owns one working directory holding the project
//! settings file and per-stack settings files, and mediates every read/write
//! of that state plus every CLI invocation.

pub mod cmd;
pub mod error;
pub mod settings;
pub mod stack;
pub mod store;
pub mod workspace;

pub use cmd::{CommandResult, CommandRunner, PulumiCli};
pub use error::{CommandError, WorkspaceError};
pub use settings::{
    ConfigMap, ConfigValue, ProjectRuntime, ProjectSettings, StackSettings,
    StackSettingsConfigValue,
};
pub use stack::{create_or_select_stack, create_stack, select_stack, Stack};
pub use store::SettingsStore;
pub use workspace::{
    LocalWorkspace, LocalWorkspaceOptions, PluginInfo, ProgramFn, StackSummary, WhoAmIResult,
    Workspace,
};
