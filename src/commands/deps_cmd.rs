use super::{load_config, select_projects};
use crate::deps::{self, DependencyGroupSet};
use crate::uv::Uv;
use crate::{venv, Workspace};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub fn execute(
    workspace: &Workspace,
    uv: &Uv,
    groups: DependencyGroupSet,
    projects: Vec<PathBuf>,
) -> Result<()> {
    let config = load_config(workspace)?;
    let target = venv::resolve_target(workspace, &config, None, None)?;
    if !target.path.is_dir() {
        bail!(
            "No venv at {}; run `uvstrap venv` first",
            target.path.display()
        );
    }

    let projects = select_projects(workspace, &config, projects);
    deps::install_set(uv, &projects, groups, &config, &target.path)
}
