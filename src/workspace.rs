use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CONFIG_FILE;

/// Workspace path types
#[derive(Debug, Clone, Copy)]
pub enum WorkspacePath {
    /// Directory holding the configuration file; relative paths resolve here
    Root,
    /// The JSON configuration document
    ConfigFile,
}

/// Workspace - the project directory being bootstrapped
///
/// The workspace is anchored at the directory that holds the configuration
/// file. By default that is `./uvstrap.json`, so the root is the current
/// directory; with `--config other/dir/env.json` it becomes `other/dir`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    config_file: PathBuf,
}

impl Workspace {
    /// Create a workspace relative to the current directory
    pub fn new(config: Option<&Path>) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to determine current directory")?;
        Ok(Self::at(&cwd, config))
    }

    /// Create a workspace relative to `base`
    pub fn at(base: &Path, config: Option<&Path>) -> Self {
        let config_file = match config {
            Some(path) => anchor(base, path),
            None => base.join(DEFAULT_CONFIG_FILE),
        };
        let root = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| base.to_path_buf());

        Self { root, config_file }
    }

    /// Get path for a specific workspace location
    pub fn path(&self, path_type: WorkspacePath) -> PathBuf {
        match path_type {
            WorkspacePath::Root => self.root.clone(),
            WorkspacePath::ConfigFile => self.config_file.clone(),
        }
    }

    /// Resolve a configured path: `~` is expanded and relative paths are
    /// taken relative to the workspace root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        anchor(&self.root, path)
    }
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
        None => path.to_path_buf(),
    }
}
