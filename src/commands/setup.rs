use crate::pipeline::{Pipeline, SetupOptions};
use crate::uv::Uv;
use crate::{ui, Workspace};
use anyhow::Result;

pub fn execute(workspace: &Workspace, uv: Uv, options: SetupOptions) -> Result<()> {
    let report = Pipeline::new(workspace, uv, options).run()?;

    ui::info(format!(
        "Environment ready in {}: uv {}, venv at {}, {} project(s)",
        ui::format_duration(report.elapsed),
        report.uv_version,
        report.venv.display(),
        report.projects
    ));
    Ok(())
}
