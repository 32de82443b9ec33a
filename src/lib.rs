// Public API
pub mod cli;
pub mod commands;
pub mod ui;

// Core domain types
mod config;
mod deps;
mod installers;
mod net;
mod pipeline;
mod process;
mod stubs;
mod uv;
mod venv;
mod version;
mod workspace;

// Re-export main types
pub use config::{ConfigStore, EnvironmentConfig, DEFAULT_CONFIG_FILE};
pub use deps::DependencyGroupSet;
pub use installers::{InstallChannel, UpdateChannel};
pub use net::{HttpNetwork, Network, DEFAULT_PROBE_URL};
pub use pipeline::{Pipeline, SetupOptions, SetupReport, Step, StepFailure};
pub use process::{Invocation, Output, ProcessError, Runner, SystemRunner};
pub use uv::{Uv, UvSettings, INSTALLER_SCRIPT_URL};
pub use venv::VenvTarget;
pub use version::UvVersion;
pub use workspace::{Workspace, WorkspacePath};
