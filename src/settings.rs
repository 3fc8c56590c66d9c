//! Settings and configuration documents: project settings, stack settings,
//! and config values exchanged with the engine.
//!
//! One serde model serves both on-disk codecs. The YAML and JSON shapes of a
//! project file differ only in how the runtime is spelled (bare string vs.
//! name-plus-options table), which the untagged [`ProjectRuntime`] absorbs;
//! engine-specific fields the client does not interpret pass through the
//! flattened `extra` map untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project-level settings document (`Pulumi.yaml` and friends). Opaque to
/// this client beyond persistence: only `name` and `runtime` are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
    pub runtime: ProjectRuntime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Engine-specific fields preserved verbatim across read/write.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ProjectSettings {
    /// Minimal settings with just a name and runtime.
    pub fn new(name: impl Into<String>, runtime: impl Into<ProjectRuntime>) -> Self {
        Self {
            name: name.into(),
            runtime: runtime.into(),
            main: None,
            description: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Project runtime: either a bare runtime name or a name with options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProjectRuntime {
    Name(String),
    Full {
        name: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        options: BTreeMap<String, serde_json::Value>,
    },
}

impl ProjectRuntime {
    pub fn name(&self) -> &str {
        match self {
            ProjectRuntime::Name(name) => name,
            ProjectRuntime::Full { name, .. } => name,
        }
    }
}

impl From<&str> for ProjectRuntime {
    fn from(name: &str) -> Self {
        ProjectRuntime::Name(name.to_string())
    }
}

impl From<String> for ProjectRuntime {
    fn from(name: String) -> Self {
        ProjectRuntime::Name(name)
    }
}

/// Per-stack settings document (`Pulumi.<stack>.yaml` and friends).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSettings {
    #[serde(rename = "secretsprovider", skip_serializing_if = "Option::is_none")]
    pub secrets_provider: Option<String>,
    #[serde(rename = "encryptedkey", skip_serializing_if = "Option::is_none")]
    pub encrypted_key: Option<String>,
    #[serde(rename = "encryptionsalt", skip_serializing_if = "Option::is_none")]
    pub encryption_salt: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, StackSettingsConfigValue>,
}

/// Config entry in a stack settings file: plain value or engine-encrypted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StackSettingsConfigValue {
    // Secure must come first: an untagged `{secure: ...}` map would otherwise
    // match the Plain arm as an arbitrary JSON object.
    Secure { secure: String },
    Plain(serde_json::Value),
}

/// A configuration value paired with its secrecy flag, as exchanged with the
/// engine's `config` commands. A secret value must never be persisted or
/// logged in plaintext by callers; the engine handles its own encryption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigValue {
    pub value: String,
    #[serde(default)]
    pub secret: bool,
}

impl ConfigValue {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: false,
        }
    }

    pub fn secret(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret: true,
        }
    }
}

/// Full configuration of one stack, keyed by config key. Ordered so bulk
/// operations apply in a deterministic sequence.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_decodes_bare_string_and_table() {
        let bare: ProjectSettings = serde_yaml::from_str("name: proj\nruntime: go\n").unwrap();
        assert_eq!(bare.runtime.name(), "go");

        let full: ProjectSettings = serde_yaml::from_str(
            "name: proj\nruntime:\n  name: nodejs\n  options:\n    typescript: true\n",
        )
        .unwrap();
        assert_eq!(full.runtime.name(), "nodejs");
        match full.runtime {
            ProjectRuntime::Full { options, .. } => {
                assert_eq!(options["typescript"], serde_json::json!(true));
            }
            other => panic!("expected full runtime, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_project_fields_pass_through() {
        let yaml = "name: proj\nruntime: python\nbackend:\n  url: file://~\n";
        let settings: ProjectSettings = serde_yaml::from_str(yaml).unwrap();
        assert!(settings.extra.contains_key("backend"));

        let rendered = serde_yaml::to_string(&settings).unwrap();
        let reparsed: ProjectSettings = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(settings, reparsed);
    }

    #[test]
    fn test_stack_settings_secure_value_shape() {
        let yaml = "secretsprovider: awskms\nconfig:\n  proj:plain: hello\n  proj:token:\n    secure: AAAB\n";
        let settings: StackSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.secrets_provider.as_deref(), Some("awskms"));
        assert_eq!(
            settings.config["proj:token"],
            StackSettingsConfigValue::Secure {
                secure: "AAAB".to_string()
            }
        );
        assert_eq!(
            settings.config["proj:plain"],
            StackSettingsConfigValue::Plain(serde_json::json!("hello"))
        );
    }

    #[test]
    fn test_config_value_secret_defaults_to_false() {
        let value: ConfigValue = serde_json::from_str(r#"{"value": "abc"}"#).unwrap();
        assert_eq!(value, ConfigValue::plain("abc"));

        let secret: ConfigValue = serde_json::from_str(r#"{"value": "abc", "secret": true}"#).unwrap();
        assert!(secret.secret);
    }
}
