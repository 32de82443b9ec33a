use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

use crate::deps::DependencyGroupSet;

/// uvstrap - bootstrap a Python development environment with uv
///
/// uvstrap makes sure uv is installed and current, recreates the project's
/// virtual environment, installs every configured project into it and
/// generates type stubs, driven by a small JSON file (`uvstrap.json`).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (relative paths inside it resolve against its directory)
    #[arg(short, long, global = true, value_name = "PATH", env = "UVSTRAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds before a subprocess or download is abandoned (0 disables)
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        env = "UVSTRAP_TIMEOUT",
        default_value_t = 900
    )]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole bootstrap
    ///
    /// Checks connectivity, loads the configuration, installs or updates uv,
    /// recreates the venv, installs dependencies and generates stubs.
    /// Stops at the first step that fails.
    Setup {
        /// Dependency groups to install with each project
        #[arg(short, long, value_enum, default_value_t = DependencyGroupSet::Baseline)]
        groups: DependencyGroupSet,

        /// Venv location (defaults to VENV_LOCATION)
        #[arg(long, value_name = "PATH")]
        venv: Option<PathBuf>,

        /// Interpreter version for the venv (defaults to PYTHON_VERSION)
        #[arg(long, value_name = "VERSION")]
        python: Option<String>,

        /// URL probed to decide whether the network is reachable
        #[arg(long, value_name = "URL", default_value = crate::net::DEFAULT_PROBE_URL)]
        probe_url: Url,

        /// Do not probe the network before starting
        #[arg(long)]
        skip_network_check: bool,
    },

    /// Manage the uv installation
    #[command(subcommand)]
    Uv(UvAction),

    /// Recreate the virtual environment
    Venv {
        /// Venv location (defaults to VENV_LOCATION)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Interpreter version (defaults to PYTHON_VERSION)
        #[arg(long, value_name = "VERSION")]
        python: Option<String>,
    },

    /// Install project dependencies into the venv
    Deps {
        /// Dependency groups to install with each project
        #[arg(short, long, value_enum, default_value_t = DependencyGroupSet::Baseline)]
        groups: DependencyGroupSet,

        /// Projects to install (defaults to PROJECTS)
        #[arg(value_name = "PROJECT")]
        projects: Vec<PathBuf>,
    },

    /// Generate type stubs for projects
    Stubs {
        /// Projects to generate stubs for (defaults to PROJECTS)
        #[arg(value_name = "PROJECT")]
        projects: Vec<PathBuf>,
    },

    /// Inspect or create the configuration file
    #[command(subcommand)]
    Config(ConfigAction),
}

#[derive(Subcommand, Debug)]
pub enum UvAction {
    /// Install uv if missing, update it and verify the result
    #[command(name = "ensure")]
    Ensure,

    /// Update uv
    #[command(name = "update")]
    Update,

    /// Print the installed uv version
    #[command(name = "version")]
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write a configuration file with default values
    #[command(name = "init")]
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    #[command(name = "show")]
    Show,

    /// Print the resolved configuration file path
    #[command(name = "path")]
    Path,
}
