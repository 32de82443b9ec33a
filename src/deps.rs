use anyhow::{Context, Result};
use clap::ValueEnum;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::EnvironmentConfig;
use crate::ui;
use crate::uv::Uv;

/// Which configured dependency groups to install alongside each project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DependencyGroupSet {
    /// The project's own dependencies only
    #[default]
    Baseline,
    /// Plus the configured development groups
    Dev,
    /// Plus the configured pipeline groups
    Pipeline,
}

impl DependencyGroupSet {
    pub fn groups(self, config: &EnvironmentConfig) -> Vec<String> {
        match self {
            DependencyGroupSet::Baseline => Vec::new(),
            DependencyGroupSet::Dev => config.dev_dependency_groups.clone(),
            DependencyGroupSet::Pipeline => config.pipeline_dependency_groups.clone(),
        }
    }
}

impl fmt::Display for DependencyGroupSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyGroupSet::Baseline => write!(f, "baseline"),
            DependencyGroupSet::Dev => write!(f, "dev"),
            DependencyGroupSet::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// `uv pip install <project> [--group <name>]...` for every project, in order,
/// into the environment at `venv`. Stops at the first project that fails.
pub fn install(uv: &Uv, projects: &[PathBuf], groups: &[String], venv: &Path) -> Result<()> {
    if projects.is_empty() {
        ui::info("No projects configured, nothing to install");
        return Ok(());
    }

    for project in projects {
        ui::info(format!(
            "Installing dependencies for '{}'...",
            project.display()
        ));
        let invocation = uv
            .command([OsStr::new("pip"), OsStr::new("install"), project.as_os_str()])
            .args(groups.iter().flat_map(|group| ["--group", group.as_str()]))
            .env("VIRTUAL_ENV", venv);

        let output = uv
            .run(&invocation)
            .with_context(|| format!("Failed to install project '{}'", project.display()))?;
        ui::debug(format!("Installed dependencies for '{}'", project.display()));
        if !output.stderr.trim().is_empty() {
            ui::debug(output.stderr.trim());
        }
    }

    ui::debug("All dependencies installed");
    Ok(())
}

/// Resolve `set` against the configuration, then [`install`].
pub fn install_set(
    uv: &Uv,
    projects: &[PathBuf],
    set: DependencyGroupSet,
    config: &EnvironmentConfig,
    venv: &Path,
) -> Result<()> {
    let groups = set.groups(config);
    ui::debug(format!("Dependency groups for {set}: {groups:?}"));
    install(uv, projects, &groups, venv)
}
