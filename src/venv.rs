use anyhow::{bail, Context, Result};
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::EnvironmentConfig;
use crate::ui;
use crate::uv::Uv;
use crate::workspace::{Workspace, WorkspacePath};

/// Location and interpreter for the virtual environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvTarget {
    pub path: PathBuf,
    pub python: Option<String>,
}

/// Fill whatever was not given explicitly from the configuration.
///
/// Fails when the location would take the workspace or the home directory
/// with it once the old venv is removed.
pub fn resolve_target(
    workspace: &Workspace,
    config: &EnvironmentConfig,
    path: Option<&Path>,
    python: Option<&str>,
) -> Result<VenvTarget> {
    let path = workspace.resolve(path.unwrap_or(config.venv_location.as_path()));
    ensure_disposable(workspace, &path)?;
    let python = python
        .map(str::to_string)
        .or_else(|| config.python_version.clone());
    Ok(VenvTarget { path, python })
}

fn ensure_disposable(workspace: &Workspace, path: &Path) -> Result<()> {
    let target = normalize(path);
    let mut protected = vec![normalize(&workspace.path(WorkspacePath::Root))];
    if let Some(dirs) = directories::BaseDirs::new() {
        protected.push(normalize(dirs.home_dir()));
    }

    if let Some(dir) = protected.iter().find(|dir| dir.starts_with(&target)) {
        bail!(
            "Refusing to use {} as the venv location: recreating it would delete {}",
            path.display(),
            dir.display()
        );
    }
    Ok(())
}

/// Canonical form when the path exists, otherwise the lexical one with `.`
/// segments and trailing separators dropped.
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize()
        .unwrap_or_else(|_| path.components().collect())
}

/// Delete anything at `path`. Returns whether something was removed.
pub fn remove_existing(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to inspect {:?}", path));
        }
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove existing venv {:?}", path))?;
    } else {
        fs::remove_file(path).with_context(|| format!("Failed to remove {:?}", path))?;
    }
    Ok(true)
}

/// Recreate the virtual environment from scratch.
///
/// Whatever exists at the target is removed first. If `uv venv` then fails the
/// old environment is gone for good.
pub fn create(uv: &Uv, target: &VenvTarget) -> Result<PathBuf> {
    ui::debug(format!("Searching for existing venv at {}", target.path.display()));
    if remove_existing(&target.path)? {
        ui::info(format!("Removed existing venv at {}", target.path.display()));
    }

    let mut args = vec![OsStr::new("venv")];
    if let Some(python) = &target.python {
        args.push(OsStr::new("--python"));
        args.push(OsStr::new(python));
    }
    args.push(target.path.as_os_str());

    uv.run(&uv.command(args))
        .with_context(|| format!("Failed to create venv at {}", target.path.display()))?;

    ui::info(format!("Venv created at {}", target.path.display()));
    Ok(target.path.clone())
}
