//! Read-only snapshots returned by workspace list and introspection
//! operations; decoded from the engine's `--json` output, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of `stack ls --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSummary {
    pub name: String,
    #[serde(default)]
    pub current: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_in_progress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One row of `plugin ls --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_time: Option<DateTime<Utc>>,
}

/// Identity of the signed-in engine user, from `whoami`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhoAmIResult {
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_summary_decodes_minimal_row() {
        let json = r#"[{"name": "dev", "current": true}]"#;
        let stacks: Vec<StackSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(stacks[0].name, "dev");
        assert!(stacks[0].current);
        assert_eq!(stacks[0].last_update, None);
    }

    #[test]
    fn test_plugin_info_decodes_camel_case_fields() {
        let json = r#"{"name": "aws", "kind": "resource", "version": "6.0.0",
                       "size": 1024, "installTime": "2026-01-05T10:00:00Z"}"#;
        let plugin: PluginInfo = serde_json::from_str(json).unwrap();
        assert_eq!(plugin.kind, "resource");
        assert_eq!(plugin.version.as_deref(), Some("6.0.0"));
        assert!(plugin.install_time.is_some());
        assert_eq!(plugin.last_used_time, None);
    }
}
