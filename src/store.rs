//! Settings store: discovery and persistence of project and stack settings
//! files across the supported on-disk formats.
//!
//! Discovery probes extensions in fixed precedence order and treats a missing
//! file as a normal absent result. Writes reuse the extension of whichever
//! file already exists, defaulting to YAML for new files, and always replace
//! the file in full.

use crate::error::WorkspaceError;
use crate::settings::{ProjectSettings, StackSettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Recognized extensions, in discovery precedence order.
const SETTINGS_EXTENSIONS: [&str; 3] = [".yaml", ".yml", ".json"];

/// Extension used when no settings file exists yet.
const DEFAULT_EXTENSION: &str = ".yaml";

/// Resolves and persists the settings files of one working directory.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    work_dir: PathBuf,
}

impl SettingsStore {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Settings-file name for a stack identifier: the segment after the last
    /// `/` of a qualified `org/project/stack` identifier, or the identifier
    /// itself when it has no separator.
    pub fn settings_name(stack_name: &str) -> &str {
        stack_name.rsplit('/').next().unwrap_or(stack_name)
    }

    /// Read the project settings file, if any exists.
    pub async fn project_settings(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ProjectSettings>, WorkspaceError> {
        self.read(None, cancel).await
    }

    /// Write the project settings file, replacing it in full.
    pub async fn save_project_settings(
        &self,
        settings: &ProjectSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.write(None, settings, cancel).await
    }

    /// Read the settings file of one stack, if any exists.
    pub async fn stack_settings(
        &self,
        stack_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<StackSettings>, WorkspaceError> {
        self.read(Some(Self::settings_name(stack_name)), cancel).await
    }

    /// Write the settings file of one stack, replacing it in full.
    pub async fn save_stack_settings(
        &self,
        stack_name: &str,
        settings: &StackSettings,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        self.write(Some(Self::settings_name(stack_name)), settings, cancel)
            .await
    }

    fn file_path(&self, settings_name: Option<&str>, ext: &str) -> PathBuf {
        let file = match settings_name {
            Some(name) => format!("Pulumi.{name}{ext}"),
            None => format!("Pulumi{ext}"),
        };
        self.work_dir.join(file)
    }

    /// First existing settings file in precedence order, with its extension.
    async fn find_existing(
        &self,
        settings_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<(PathBuf, &'static str)>, WorkspaceError> {
        for ext in SETTINGS_EXTENSIONS {
            let path = self.file_path(settings_name, ext);
            let exists = cancellable(cancel, tokio::fs::try_exists(&path))
                .await?
                .map_err(|e| WorkspaceError::io(&path, e))?;
            if exists {
                return Ok(Some((path, ext)));
            }
        }
        Ok(None)
    }

    async fn read<T: DeserializeOwned>(
        &self,
        settings_name: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, WorkspaceError> {
        let Some((path, ext)) = self.find_existing(settings_name, cancel).await? else {
            return Ok(None);
        };
        let content = cancellable(cancel, tokio::fs::read_to_string(&path))
            .await?
            .map_err(|e| WorkspaceError::io(&path, e))?;
        let value = if ext == ".json" {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(Some(value))
    }

    async fn write<T: Serialize>(
        &self,
        settings_name: Option<&str>,
        value: &T,
        cancel: &CancellationToken,
    ) -> Result<(), WorkspaceError> {
        let (path, ext) = match self.find_existing(settings_name, cancel).await? {
            Some(found) => found,
            None => (
                self.file_path(settings_name, DEFAULT_EXTENSION),
                DEFAULT_EXTENSION,
            ),
        };
        let content = if ext == ".json" {
            serde_json::to_string_pretty(value)?
        } else {
            serde_yaml::to_string(value)?
        };
        cancellable(cancel, tokio::fs::write(&path, content))
            .await?
            .map_err(|e| WorkspaceError::io(&path, e))
    }
}

/// Race a future against the cancellation token.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, WorkspaceError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(WorkspaceError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    fn sample_project() -> ProjectSettings {
        ProjectSettings::new("proj", "generic")
    }

    #[test]
    fn test_settings_name_uses_last_segment() {
        assert_eq!(SettingsStore::settings_name("org/proj/dev"), "dev");
        assert_eq!(SettingsStore::settings_name("dev"), "dev");
    }

    proptest! {
        #[test]
        fn test_settings_name_never_contains_separator(stack in "[a-z/]{1,20}") {
            prop_assert!(!SettingsStore::settings_name(&stack).contains('/'));
        }
    }

    #[tokio::test]
    async fn test_absent_project_settings_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        assert_eq!(store.project_settings(&cancel()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_project_settings_round_trip_defaults_to_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        let settings = sample_project();

        store
            .save_project_settings(&settings, &cancel())
            .await
            .unwrap();
        assert!(dir.path().join("Pulumi.yaml").exists());
        assert_eq!(
            store.project_settings(&cancel()).await.unwrap(),
            Some(settings)
        );
    }

    #[tokio::test]
    async fn test_round_trip_preserves_existing_extension() {
        for ext in [".yaml", ".yml", ".json"] {
            let dir = tempfile::tempdir().unwrap();
            let store = SettingsStore::new(dir.path());
            let seed = if ext == ".json" {
                r#"{"name": "old", "runtime": "go"}"#
            } else {
                "name: old\nruntime: go\n"
            };
            std::fs::write(dir.path().join(format!("Pulumi{ext}")), seed).unwrap();

            let settings = sample_project();
            store
                .save_project_settings(&settings, &cancel())
                .await
                .unwrap();
            assert_eq!(
                store.project_settings(&cancel()).await.unwrap(),
                Some(settings),
                "round trip failed for {ext}"
            );
            // No second file appeared under another extension.
            let count = std::fs::read_dir(dir.path()).unwrap().count();
            assert_eq!(count, 1, "extra settings file written for {ext}");
        }
    }

    #[tokio::test]
    async fn test_yaml_takes_precedence_over_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(dir.path().join("Pulumi.yaml"), "name: yaml-one\nruntime: go\n").unwrap();
        std::fs::write(
            dir.path().join("Pulumi.json"),
            r#"{"name": "json-one", "runtime": "go"}"#,
        )
        .unwrap();

        let read = store.project_settings(&cancel()).await.unwrap().unwrap();
        assert_eq!(read.name, "yaml-one");

        store
            .save_project_settings(&ProjectSettings::new("updated", "go"), &cancel())
            .await
            .unwrap();
        let yaml = std::fs::read_to_string(dir.path().join("Pulumi.yaml")).unwrap();
        assert!(yaml.contains("updated"));
        let json = std::fs::read_to_string(dir.path().join("Pulumi.json")).unwrap();
        assert!(json.contains("json-one"));
    }

    #[tokio::test]
    async fn test_stack_settings_file_uses_derived_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        let settings = StackSettings {
            secrets_provider: Some("passphrase".to_string()),
            ..Default::default()
        };

        store
            .save_stack_settings("org/proj/dev", &settings, &cancel())
            .await
            .unwrap();
        assert!(dir.path().join("Pulumi.dev.yaml").exists());

        // Qualified and bare identifiers resolve to the same file.
        assert_eq!(
            store.stack_settings("dev", &cancel()).await.unwrap(),
            Some(settings)
        );
    }

    #[tokio::test]
    async fn test_cancelled_read_propagates_cancellation() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        let token = CancellationToken::new();
        token.cancel();
        let err = store.project_settings(&token).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Cancelled));
    }

    #[tokio::test]
    async fn test_malformed_yaml_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path());
        std::fs::write(dir.path().join("Pulumi.yaml"), "name: [unclosed\n").unwrap();
        let err = store.project_settings(&cancel()).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::Yaml(_)));
    }
}
