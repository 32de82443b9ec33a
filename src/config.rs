use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ui;

/// File name used when no explicit configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "uvstrap.json";

/// Environment defaults shared by every step of the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentConfig {
    #[serde(rename = "VENV_LOCATION")]
    pub venv_location: PathBuf,
    #[serde(rename = "PYTHON_VERSION")]
    pub python_version: Option<String>,
    #[serde(rename = "PROJECTS")]
    pub projects: Vec<PathBuf>,
    #[serde(rename = "DEV_DEP_GROUPS")]
    pub dev_dependency_groups: Vec<String>,
    #[serde(rename = "PIPELINE_DEP_GROUPS")]
    pub pipeline_dependency_groups: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            venv_location: PathBuf::from(".venv"),
            python_version: None,
            projects: Vec::new(),
            dev_dependency_groups: vec!["dev".to_string(), "test".to_string()],
            pipeline_dependency_groups: vec!["pipeline".to_string(), "test".to_string()],
        }
    }
}

/// The keys actually present in a configuration document. Absent keys leave
/// the in-memory value alone; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    #[serde(rename = "VENV_LOCATION")]
    venv_location: Option<PathBuf>,
    /// `Some(None)` when the document holds an explicit `null`.
    #[serde(rename = "PYTHON_VERSION", default, deserialize_with = "present")]
    python_version: Option<Option<String>>,
    #[serde(rename = "PROJECTS")]
    projects: Option<Vec<PathBuf>>,
    #[serde(rename = "DEV_DEP_GROUPS")]
    dev_dependency_groups: Option<Vec<String>>,
    #[serde(rename = "PIPELINE_DEP_GROUPS")]
    pipeline_dependency_groups: Option<Vec<String>>,
}

fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ConfigOverlay {
    fn parse(contents: &str) -> serde_json::Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(contents)
    }

    fn apply(self, config: &mut EnvironmentConfig) {
        if let Some(venv_location) = self.venv_location {
            config.venv_location = venv_location;
        }
        if let Some(python_version) = self.python_version {
            config.python_version = python_version;
        }
        if let Some(projects) = self.projects {
            config.projects = projects;
        }
        if let Some(groups) = self.dev_dependency_groups {
            config.dev_dependency_groups = groups;
        }
        if let Some(groups) = self.pipeline_dependency_groups {
            config.pipeline_dependency_groups = groups;
        }
    }
}

/// In-memory configuration bound to the JSON file it is loaded from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    config: EnvironmentConfig,
}

impl ConfigStore {
    /// Create a store holding the hard-coded defaults. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: EnvironmentConfig::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn into_config(self) -> EnvironmentConfig {
        self.config
    }

    /// Overlay the document at `path` (or the store's own path) onto the
    /// in-memory values, writing a default document first if none exists.
    ///
    /// On error the in-memory values are left exactly as they were.
    pub fn load(&mut self, path: Option<&Path>) -> Result<()> {
        let path = path.unwrap_or(self.path.as_path()).to_path_buf();

        if !path.exists() {
            ui::warn(format!(
                "No configuration found at {}, writing defaults",
                path.display()
            ));
            Self::write(&path, &EnvironmentConfig::default())
                .context("Failed to create default configuration")?;
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let overlay = ConfigOverlay::parse(&contents)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        overlay.apply(&mut self.config);

        ui::debug(format!("Loaded configuration from {}", path.display()));
        Ok(())
    }

    /// Serialize the whole document to `path`, replacing whatever is there.
    pub fn write(path: &Path, config: &EnvironmentConfig) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let mut contents =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        contents.push('\n');
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }

    /// Read a fresh snapshot (defaults overlaid with the file) without
    /// touching this store.
    pub fn reload(&self) -> Result<EnvironmentConfig> {
        let mut fresh = Self::new(self.path.clone());
        fresh.load(None)?;
        Ok(fresh.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> ConfigStore {
        ConfigStore::new(temp.path().join(DEFAULT_CONFIG_FILE))
    }

    #[test]
    fn test_defaults() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.venv_location, PathBuf::from(".venv"));
        assert_eq!(config.python_version, None);
        assert!(config.projects.is_empty());
        assert_eq!(config.dev_dependency_groups, ["dev", "test"]);
        assert_eq!(config.pipeline_dependency_groups, ["pipeline", "test"]);
    }

    #[test]
    fn test_load_missing_file_writes_defaults() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);

        store.load(None).unwrap();

        assert!(store.path().exists());
        assert_eq!(store.config(), &EnvironmentConfig::default());

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(written["VENV_LOCATION"], ".venv");
        assert!(written["PYTHON_VERSION"].is_null());
        assert_eq!(written["PROJECTS"], serde_json::json!([]));
        assert_eq!(written["DEV_DEP_GROUPS"], serde_json::json!(["dev", "test"]));
        assert_eq!(
            written["PIPELINE_DEP_GROUPS"],
            serde_json::json!(["pipeline", "test"])
        );
    }

    #[test]
    fn test_load_missing_file_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/uvstrap.json");
        let mut store = ConfigStore::new(&path);

        store.load(None).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_partial_document_only_overwrites_present_keys() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(store.path(), r#"{"PYTHON_VERSION": "3.11"}"#).unwrap();

        store.load(None).unwrap();

        let config = store.config();
        assert_eq!(config.python_version.as_deref(), Some("3.11"));
        assert_eq!(config.venv_location, PathBuf::from(".venv"));
        assert!(config.projects.is_empty());
        assert_eq!(config.dev_dependency_groups, ["dev", "test"]);
    }

    #[test]
    fn test_missing_keys_keep_prior_values_not_defaults() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(
            store.path(),
            r#"{"VENV_LOCATION": "env", "PROJECTS": ["pkg-a", "pkg-b"]}"#,
        )
        .unwrap();
        store.load(None).unwrap();

        let second = temp.path().join("second.json");
        fs::write(&second, r#"{"PYTHON_VERSION": "3.12"}"#).unwrap();
        store.load(Some(&second)).unwrap();

        let config = store.config();
        assert_eq!(config.venv_location, PathBuf::from("env"));
        assert_eq!(
            config.projects,
            [PathBuf::from("pkg-a"), PathBuf::from("pkg-b")]
        );
        assert_eq!(config.python_version.as_deref(), Some("3.12"));
    }

    #[test]
    fn test_explicit_null_clears_python_version() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(store.path(), r#"{"PYTHON_VERSION": "3.11"}"#).unwrap();
        store.load(None).unwrap();

        fs::write(store.path(), r#"{"PYTHON_VERSION": null}"#).unwrap();
        store.load(None).unwrap();

        assert_eq!(store.config().python_version, None);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(
            store.path(),
            r#"{"SOMETHING_ELSE": 42, "DEV_DEP_GROUPS": ["lint"]}"#,
        )
        .unwrap();

        store.load(None).unwrap();

        assert_eq!(store.config().dev_dependency_groups, ["lint"]);
    }

    #[test]
    fn test_empty_file_is_an_empty_document() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(store.path(), "  \n").unwrap();

        store.load(None).unwrap();

        assert_eq!(store.config(), &EnvironmentConfig::default());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "  \n");
    }

    #[test]
    fn test_invalid_document_leaves_state_untouched() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(store.path(), r#"{"PROJECTS": ["keep-me"]}"#).unwrap();
        store.load(None).unwrap();
        let before = store.config().clone();

        fs::write(store.path(), r#"{"PROJECTS": ["lost"], "VENV_LOCATION": 7}"#).unwrap();
        let error = store.load(None).unwrap_err();

        assert!(format!("{error:#}").contains("Failed to parse config file"));
        assert_eq!(store.config(), &before);
    }

    #[test]
    fn test_load_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(
            store.path(),
            r#"{"PROJECTS": ["a"], "PIPELINE_DEP_GROUPS": ["ci"]}"#,
        )
        .unwrap();

        store.load(None).unwrap();
        let first = store.config().clone();
        store.load(None).unwrap();

        assert_eq!(store.config(), &first);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&path, r#"{"PROJECTS": ["old"], "EXTRA": true}"#).unwrap();

        ConfigStore::write(&path, &EnvironmentConfig::default()).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("old"));
        assert!(!contents.contains("EXTRA"));
        assert!(contents.contains("\"VENV_LOCATION\": \".venv\""));
    }

    #[test]
    fn test_reload_returns_fresh_snapshot() {
        let temp = TempDir::new().unwrap();
        let mut store = store_in(&temp);
        fs::write(store.path(), r#"{"VENV_LOCATION": "first"}"#).unwrap();
        store.load(None).unwrap();

        fs::write(store.path(), r#"{"PROJECTS": ["p"]}"#).unwrap();
        let snapshot = store.reload().unwrap();

        assert_eq!(snapshot.venv_location, PathBuf::from(".venv"));
        assert_eq!(snapshot.projects, [PathBuf::from("p")]);
        assert_eq!(store.config().venv_location, PathBuf::from("first"));
        assert!(store.config().projects.is_empty());
    }
}
