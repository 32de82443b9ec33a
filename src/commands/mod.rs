use crate::cli::{Cli, Commands};
use crate::config::{ConfigStore, EnvironmentConfig};
use crate::net::HttpNetwork;
use crate::pipeline::SetupOptions;
use crate::process::SystemRunner;
use crate::uv::{Uv, UvSettings};
use crate::{Workspace, WorkspacePath};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

mod config_cmd;
mod deps_cmd;
mod setup;
mod stubs_cmd;
mod uv_cmd;
mod venv_cmd;

pub fn execute(cli: Cli) -> Result<()> {
    // Create workspace - this is the root entry point
    let workspace = Workspace::new(cli.config.as_deref())?;

    match cli.command {
        Commands::Config(action) => config_cmd::execute(&workspace, action),
        command => run_with_uv(&workspace, cli.timeout, command),
    }
}

/// Commands that shell out to uv or the network.
fn run_with_uv(workspace: &Workspace, timeout_secs: u64, command: Commands) -> Result<()> {
    let timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));
    let runner = SystemRunner::new(timeout);
    let network = HttpNetwork::new(timeout)?;
    let uv = Uv::new(&runner, &network, UvSettings::default());

    match command {
        Commands::Setup {
            groups,
            venv,
            python,
            probe_url,
            skip_network_check,
        } => {
            let options = SetupOptions {
                groups,
                probe_url: (!skip_network_check).then(|| probe_url.to_string()),
                venv,
                python,
            };
            setup::execute(workspace, uv, options)
        }

        Commands::Uv(action) => uv_cmd::execute(&uv, action),

        Commands::Venv { path, python } => venv_cmd::execute(workspace, &uv, path, python),

        Commands::Deps { groups, projects } => deps_cmd::execute(workspace, &uv, groups, projects),

        Commands::Stubs { projects } => stubs_cmd::execute(workspace, &uv, projects),

        Commands::Config(action) => config_cmd::execute(workspace, action),
    }
}

/// Load the workspace configuration, writing defaults if there is none.
fn load_config(workspace: &Workspace) -> Result<EnvironmentConfig> {
    let mut store = ConfigStore::new(workspace.path(WorkspacePath::ConfigFile));
    store.load(None)?;
    Ok(store.into_config())
}

/// Projects named on the command line, or the configured ones resolved
/// against the workspace root.
fn select_projects(
    workspace: &Workspace,
    config: &EnvironmentConfig,
    explicit: Vec<PathBuf>,
) -> Vec<PathBuf> {
    if !explicit.is_empty() {
        return explicit;
    }
    config
        .projects
        .iter()
        .map(|project| workspace.resolve(project))
        .collect()
}
