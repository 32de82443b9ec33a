use crate::cli::ConfigAction;
use crate::config::{ConfigStore, EnvironmentConfig};
use crate::{ui, Workspace, WorkspacePath};
use anyhow::{bail, Context, Result};

pub fn execute(workspace: &Workspace, action: ConfigAction) -> Result<()> {
    let path = workspace.path(WorkspacePath::ConfigFile);

    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            ConfigStore::write(&path, &EnvironmentConfig::default())?;
            ui::info(format!("Wrote default configuration to {}", path.display()));
            Ok(())
        }
        ConfigAction::Show => {
            let mut store = ConfigStore::new(path);
            store.load(None)?;
            let rendered = serde_json::to_string_pretty(store.config())
                .context("Failed to serialize configuration")?;
            println!("{rendered}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
