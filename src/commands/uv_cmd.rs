use crate::cli::UvAction;
use crate::ui;
use crate::uv::Uv;
use anyhow::{Context, Result};

pub fn execute(uv: &Uv, action: UvAction) -> Result<()> {
    match action {
        UvAction::Ensure => {
            if uv.version().is_none() {
                uv.install()?;
            }
            uv.update()?;
            let version = uv.version().context("uv is not available after installation")?;
            ui::info(format!("uv {version} is ready"));
            Ok(())
        }
        UvAction::Update => uv.update(),
        UvAction::Version => {
            let version = uv.version().context("uv is not installed")?;
            println!("{version}");
            Ok(())
        }
    }
}
