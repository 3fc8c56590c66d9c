//! Workspace domain: the polymorphic workspace contract, the local
//! implementation, and the read-only snapshots its operations return.

mod contract;
mod local;
mod types;

pub use contract::Workspace;
pub use local::{LocalWorkspace, LocalWorkspaceOptions, ProgramFn};
pub use types::{PluginInfo, StackSummary, WhoAmIResult};
