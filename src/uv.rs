use anyhow::Result;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::installers;
use crate::net::Network;
use crate::process::{Invocation, Output, ProcessError, Runner};
use crate::ui;
use crate::version::UvVersion;

/// Standalone installer published by the uv project.
pub const INSTALLER_SCRIPT_URL: &str = "https://astral.sh/uv/install.sh";

#[derive(Debug, Clone)]
pub struct UvSettings {
    /// Fixed uv executable. When unset, uv is looked up on `PATH` and then in
    /// the directories the standalone installer writes to.
    pub program: Option<PathBuf>,
    pub installer_url: String,
    /// Try the shell-script installer before falling back to pip.
    pub script_channel: bool,
}

impl Default for UvSettings {
    fn default() -> Self {
        Self {
            program: None,
            installer_url: INSTALLER_SCRIPT_URL.to_string(),
            script_channel: !cfg!(windows),
        }
    }
}

/// Handle on the uv executable plus the channels used to install and update it.
pub struct Uv<'a> {
    runner: &'a dyn Runner,
    network: &'a dyn Network,
    settings: UvSettings,
}

impl<'a> Uv<'a> {
    pub fn new(runner: &'a dyn Runner, network: &'a dyn Network, settings: UvSettings) -> Self {
        Self {
            runner,
            network,
            settings,
        }
    }

    pub fn runner(&self) -> &'a dyn Runner {
        self.runner
    }

    pub fn network(&self) -> &'a dyn Network {
        self.network
    }

    pub fn settings(&self) -> &UvSettings {
        &self.settings
    }

    /// The executable to invoke. Resolved on every call so a uv installed
    /// moments ago is picked up.
    pub fn program(&self) -> OsString {
        match &self.settings.program {
            Some(program) => program.clone().into_os_string(),
            None => locate()
                .map(PathBuf::into_os_string)
                .unwrap_or_else(|| OsString::from("uv")),
        }
    }

    pub fn command<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Invocation::new(self.program()).args(args)
    }

    pub fn run(&self, invocation: &Invocation) -> Result<Output, ProcessError> {
        self.runner.run(invocation)
    }

    /// Query `uv --version`. `None` when uv is missing, fails, or prints
    /// something that is not a version line.
    pub fn version(&self) -> Option<UvVersion> {
        match self.run(&self.command(["--version"])) {
            Ok(output) => match UvVersion::parse(&output.stdout) {
                Some(version) => {
                    ui::debug(format!("Found uv {version}"));
                    Some(version)
                }
                None => {
                    ui::warn(format!(
                        "Unable to extract uv version information from {:?}",
                        output.stdout.trim()
                    ));
                    None
                }
            },
            Err(err) if err.is_missing_binary() => {
                ui::warn("No installations of uv found");
                None
            }
            Err(err) => {
                ui::warn(format!("Unable to query uv version: {err}"));
                None
            }
        }
    }

    /// Install uv through the first channel that works.
    pub fn install(&self) -> Result<()> {
        installers::install(self)
    }

    /// Update uv through the first channel that works.
    pub fn update(&self) -> Result<()> {
        installers::update(self)
    }
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "uv.exe"
    } else {
        "uv"
    }
}

/// Directories the standalone installer may place uv in, in lookup order.
fn install_dirs() -> Vec<PathBuf> {
    let home = directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf());
    let mut dirs = Vec::new();

    if let Some(bin_home) = env::var_os("XDG_BIN_HOME").filter(|value| !value.is_empty()) {
        dirs.push(PathBuf::from(bin_home));
    }
    if let Some(home) = &home {
        dirs.push(home.join(".local/bin"));
    }
    if let Some(cargo_home) = env::var_os("CARGO_HOME").filter(|value| !value.is_empty()) {
        dirs.push(PathBuf::from(cargo_home).join("bin"));
    }
    if let Some(home) = &home {
        dirs.push(home.join(".cargo/bin"));
    }
    dirs
}

fn locate() -> Option<PathBuf> {
    if let Ok(path) = which::which(binary_name()) {
        return Some(path);
    }
    install_dirs()
        .into_iter()
        .map(|dir| dir.join(binary_name()))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
pub(crate) fn test_settings() -> UvSettings {
    UvSettings {
        program: Some(PathBuf::from("uv")),
        installer_url: "https://example.invalid/install.sh".to_string(),
        script_channel: true,
    }
}
