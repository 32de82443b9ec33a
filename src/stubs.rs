use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::ui;
use crate::uv::Uv;

/// Directory, relative to each project, that receives the generated stubs.
pub const STUBS_DIR: &str = "stubs";

/// Importable package name for a project directory: its last path component
/// with dashes turned into underscores.
pub fn package_name(project: &Path) -> Result<String> {
    let name = match project.file_name() {
        Some(name) => name.to_os_string(),
        None => project
            .canonicalize()
            .ok()
            .and_then(|path| path.file_name().map(OsStr::to_os_string))
            .with_context(|| format!("Cannot derive a package name from {:?}", project))?,
    };
    Ok(name.to_string_lossy().replace('-', "_"))
}

pub fn output_dir(project: &Path) -> PathBuf {
    project.join(STUBS_DIR)
}

/// Run `uv run stubgen` for every project in order. Stops at the first failure.
pub fn generate(uv: &Uv, projects: &[PathBuf], venv: &Path) -> Result<()> {
    if projects.is_empty() {
        ui::info("No projects configured, no stubs to generate");
        return Ok(());
    }

    for project in projects {
        let package = package_name(project)?;
        let output = output_dir(project);
        ui::info(format!("Generating stubs for '{package}'..."));

        let invocation = uv
            .command([
                OsStr::new("run"),
                OsStr::new("stubgen"),
                OsStr::new("-p"),
                OsStr::new(&package),
                OsStr::new("-o"),
                output.as_os_str(),
            ])
            .env("VIRTUAL_ENV", venv);

        uv.run(&invocation)
            .with_context(|| format!("Unable to generate stubs for '{package}'"))?;
        ui::debug(format!("Stubs for '{package}' written to {}", output.display()));
    }

    ui::info("All stubs generated");
    Ok(())
}
