use anyhow::{Context, Result};

use crate::process::Invocation;
use crate::ui;
use crate::uv::Uv;

/// Download the standalone installer and pipe it into `sh`.
///
/// The exit status of `sh` is only reported; whether uv actually landed is
/// decided by the version check that follows.
pub(crate) fn install(uv: &Uv) -> Result<()> {
    let url = &uv.settings().installer_url;
    let script = uv
        .network()
        .fetch(url)
        .context("Failed to download the uv installer script")?;

    if let Err(err) = uv.runner().run(&Invocation::new("sh").stdin(script)) {
        ui::warn(format!("uv installer script reported a failure: {err}"));
    }
    Ok(())
}
