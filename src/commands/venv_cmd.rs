use super::load_config;
use crate::uv::Uv;
use crate::{venv, Workspace};
use anyhow::Result;
use std::path::PathBuf;

pub fn execute(
    workspace: &Workspace,
    uv: &Uv,
    path: Option<PathBuf>,
    python: Option<String>,
) -> Result<()> {
    let config = load_config(workspace)?;
    let target = venv::resolve_target(workspace, &config, path.as_deref(), python.as_deref())?;
    venv::create(uv, &target)?;
    Ok(())
}
