use anyhow::{bail, Context, Result};
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::ConfigStore;
use crate::deps::{self, DependencyGroupSet};
use crate::net::DEFAULT_PROBE_URL;
use crate::stubs;
use crate::ui;
use crate::uv::Uv;
use crate::venv;
use crate::version::UvVersion;
use crate::workspace::{Workspace, WorkspacePath};

/// The bootstrap steps, in the only order they ever run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CheckNetwork,
    LoadConfig,
    EnsureUv,
    UpdateUv,
    VerifyUv,
    CreateVenv,
    InstallDependencies,
    GenerateStubs,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::CheckNetwork,
        Step::LoadConfig,
        Step::EnsureUv,
        Step::UpdateUv,
        Step::VerifyUv,
        Step::CreateVenv,
        Step::InstallDependencies,
        Step::GenerateStubs,
    ];

    /// One-based position within [`Step::ALL`].
    pub fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|step| *step == self)
            .map_or(0, |index| index + 1)
    }

    pub fn describe(self) -> &'static str {
        match self {
            Step::CheckNetwork => "Checking network connectivity",
            Step::LoadConfig => "Loading configuration",
            Step::EnsureUv => "Checking uv installation",
            Step::UpdateUv => "Updating uv",
            Step::VerifyUv => "Verifying uv installation",
            Step::CreateVenv => "Creating venv",
            Step::InstallDependencies => "Installing dependencies",
            Step::GenerateStubs => "Generating stubs",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// The first step that failed, together with why.
#[derive(Debug)]
pub struct StepFailure {
    pub step: Step,
    pub error: anyhow::Error,
}

impl StepFailure {
    pub fn position(&self) -> usize {
        self.step.position()
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Aborted at step {}/{} ({})",
            self.position(),
            Step::ALL.len(),
            self.step
        )
    }
}

impl StdError for StepFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        let cause: &(dyn StdError + Send + Sync + 'static) = self.error.as_ref();
        Some(cause)
    }
}

#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub groups: DependencyGroupSet,
    /// Reachability probe; `None` skips the network check.
    pub probe_url: Option<String>,
    /// Overrides the configured venv location.
    pub venv: Option<PathBuf>,
    /// Overrides the configured interpreter version.
    pub python: Option<String>,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            groups: DependencyGroupSet::default(),
            probe_url: Some(DEFAULT_PROBE_URL.to_string()),
            venv: None,
            python: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SetupReport {
    pub uv_version: UvVersion,
    pub venv: PathBuf,
    pub projects: usize,
    pub elapsed: Duration,
}

/// Runs every [`Step`] in order and stops at the first failure. Nothing done
/// by earlier steps is undone.
pub struct Pipeline<'a> {
    workspace: &'a Workspace,
    uv: Uv<'a>,
    options: SetupOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(workspace: &'a Workspace, uv: Uv<'a>, options: SetupOptions) -> Self {
        Self {
            workspace,
            uv,
            options,
        }
    }

    pub fn run(&self) -> Result<SetupReport, StepFailure> {
        let started = Instant::now();

        self.step(Step::CheckNetwork, || match &self.options.probe_url {
            Some(url) => self.uv.network().probe(url),
            None => {
                ui::info("Network check skipped");
                Ok(())
            }
        })?;

        let config = self.step(Step::LoadConfig, || {
            let mut store = ConfigStore::new(self.workspace.path(WorkspacePath::ConfigFile));
            store.load(None)?;
            Ok(store.into_config())
        })?;

        // A uv that cannot be installed aborts here; re-running is up to the caller.
        self.step(Step::EnsureUv, || {
            if self.uv.version().is_none() {
                self.uv.install()?;
            }
            Ok(())
        })?;

        self.step(Step::UpdateUv, || self.uv.update())?;

        let uv_version = self.step(Step::VerifyUv, || {
            self.uv
                .version()
                .context("uv is not available after installation")
        })?;

        let venv_path = self.step(Step::CreateVenv, || {
            let target = venv::resolve_target(
                self.workspace,
                &config,
                self.options.venv.as_deref(),
                self.options.python.as_deref(),
            )?;
            let path = venv::create(&self.uv, &target)?;
            if !path.exists() {
                bail!("uv reported success but {:?} does not exist", path);
            }
            Ok(path)
        })?;

        let projects: Vec<PathBuf> = config
            .projects
            .iter()
            .map(|project| self.workspace.resolve(project))
            .collect();

        self.step(Step::InstallDependencies, || {
            deps::install_set(&self.uv, &projects, self.options.groups, &config, &venv_path)
        })?;

        self.step(Step::GenerateStubs, || {
            stubs::generate(&self.uv, &projects, &venv_path)
        })?;

        Ok(SetupReport {
            uv_version,
            venv: venv_path,
            projects: projects.len(),
            elapsed: started.elapsed(),
        })
    }

    fn step<T>(&self, step: Step, action: impl FnOnce() -> Result<T>) -> Result<T, StepFailure> {
        ui::info(ui::step(step.position(), Step::ALL.len(), step));
        action().map_err(|error| StepFailure { step, error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::fake::{Offline, Online};
    use crate::process::fake::{fail, missing, ok, ScriptedRunner};
    use crate::process::{Invocation, Output, ProcessError};
    use crate::uv::test_settings;
    use rstest::rstest;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn online() -> Online {
        Online { body: Vec::new() }
    }

    /// Behaves like a healthy uv: answers version queries and creates the
    /// venv directory it is asked for.
    fn healthy_uv(invocation: &Invocation) -> Result<Output, ProcessError> {
        let args: Vec<String> = invocation
            .get_args()
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        match args.first().map(String::as_str) {
            Some("--version") => ok("uv 0.5.11 (c4d0caaee 2024-12-19)"),
            Some("self") => ok(""),
            Some("venv") => {
                fs::create_dir_all(args.last().unwrap()).unwrap();
                ok("")
            }
            Some("pip") | Some("run") => ok(""),
            _ => fail(invocation),
        }
    }

    fn options_without_probe() -> SetupOptions {
        SetupOptions {
            probe_url: None,
            ..SetupOptions::default()
        }
    }

    #[test]
    fn test_step_positions() {
        assert_eq!(Step::CheckNetwork.position(), 1);
        assert_eq!(Step::CreateVenv.position(), 6);
        assert_eq!(Step::GenerateStubs.position(), Step::ALL.len());
    }

    #[test]
    fn test_failure_display_and_source() {
        let failure = StepFailure {
            step: Step::UpdateUv,
            error: anyhow::anyhow!("no channel worked"),
        };

        assert_eq!(failure.to_string(), "Aborted at step 4/8 (Updating uv)");
        assert_eq!(failure.source().unwrap().to_string(), "no channel worked");

        let wrapped = anyhow::Error::from(failure);
        assert_eq!(
            format!("{wrapped:#}"),
            "Aborted at step 4/8 (Updating uv): no channel worked"
        );
    }

    #[test]
    fn test_empty_config_with_uv_present_completes() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        fs::write(workspace.path(WorkspacePath::ConfigFile), "").unwrap();
        let runner = ScriptedRunner::new(healthy_uv);
        let network = online();
        let uv = Uv::new(&runner, &network, test_settings());

        let report = Pipeline::new(&workspace, uv, SetupOptions::default())
            .run()
            .unwrap();

        let venv = temp.path().join(".venv");
        assert!(venv.is_dir());
        assert_eq!(report.venv, venv);
        assert_eq!(report.projects, 0);
        assert_eq!(report.uv_version.to_string(), "0.5.11");
        assert_eq!(
            fs::read_to_string(workspace.path(WorkspacePath::ConfigFile)).unwrap(),
            ""
        );
        assert_eq!(
            runner.calls(),
            [
                "uv --version".to_string(),
                "uv self update".to_string(),
                "uv --version".to_string(),
                format!("uv venv {}", venv.display()),
            ]
        );
    }

    #[test]
    fn test_configured_projects_flow_through_every_step() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        fs::write(
            workspace.path(WorkspacePath::ConfigFile),
            r#"{"PROJECTS": ["libs/core"], "PYTHON_VERSION": "3.12", "VENV_LOCATION": "env"}"#,
        )
        .unwrap();
        let runner = ScriptedRunner::new(healthy_uv);
        let uv = Uv::new(&runner, &Offline, test_settings());
        let options = SetupOptions {
            groups: DependencyGroupSet::Dev,
            ..options_without_probe()
        };

        let report = Pipeline::new(&workspace, uv, options).run().unwrap();

        let venv = temp.path().join("env");
        let core = temp.path().join("libs/core");
        assert_eq!(report.projects, 1);
        let calls = runner.calls();
        assert_eq!(
            &calls[3..],
            [
                format!("uv venv --python 3.12 {}", venv.display()),
                format!("uv pip install {} --group dev --group test", core.display()),
                format!("uv run stubgen -p core -o {}", core.join("stubs").display()),
            ]
        );
    }

    #[test]
    fn test_missing_config_is_written_with_defaults() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        let runner = ScriptedRunner::new(healthy_uv);
        let uv = Uv::new(&runner, &Offline, test_settings());

        Pipeline::new(&workspace, uv, options_without_probe())
            .run()
            .unwrap();

        assert!(workspace.path(WorkspacePath::ConfigFile).exists());
    }

    #[test]
    fn test_unreachable_network_aborts_first() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        let runner = ScriptedRunner::new(healthy_uv);
        let uv = Uv::new(&runner, &Offline, test_settings());

        let failure = Pipeline::new(&workspace, uv, SetupOptions::default())
            .run()
            .unwrap_err();

        assert_eq!(failure.step, Step::CheckNetwork);
        assert_eq!(failure.position(), 1);
        assert!(runner.calls().is_empty());
        assert!(!workspace.path(WorkspacePath::ConfigFile).exists());
    }

    #[test]
    fn test_malformed_config_aborts_at_load() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        fs::write(workspace.path(WorkspacePath::ConfigFile), "{not json").unwrap();
        let runner = ScriptedRunner::new(healthy_uv);
        let uv = Uv::new(&runner, &Offline, test_settings());

        let failure = Pipeline::new(&workspace, uv, options_without_probe())
            .run()
            .unwrap_err();

        assert_eq!(failure.step, Step::LoadConfig);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_uninstallable_uv_aborts_without_retry() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        let runner = ScriptedRunner::new(missing);
        let uv = Uv::new(&runner, &Offline, test_settings());

        let failure = Pipeline::new(&workspace, uv, options_without_probe())
            .run()
            .unwrap_err();

        assert_eq!(failure.step, Step::EnsureUv);
        assert_eq!(runner.count("uv self update"), 0);
        assert!(!temp.path().join(".venv").exists());
    }

    #[test]
    fn test_venv_failure_stops_before_dependencies() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        fs::write(
            workspace.path(WorkspacePath::ConfigFile),
            r#"{"PROJECTS": ["pkg"]}"#,
        )
        .unwrap();
        let stale = temp.path().join(".venv");
        fs::create_dir_all(&stale).unwrap();
        let runner = ScriptedRunner::new(|invocation| {
            if invocation.to_string().contains(" venv ") {
                fail(invocation)
            } else {
                healthy_uv(invocation)
            }
        });
        let uv = Uv::new(&runner, &Offline, test_settings());

        let failure = Pipeline::new(&workspace, uv, options_without_probe())
            .run()
            .unwrap_err();

        assert_eq!(failure.step, Step::CreateVenv);
        assert_eq!(failure.position(), 6);
        assert!(!stale.exists());
        assert_eq!(runner.count("uv pip"), 0);
        assert_eq!(runner.count("uv run"), 0);
    }

    #[rstest]
    #[case(r#"{"VENV_LOCATION": ""}"#)]
    #[case(r#"{"VENV_LOCATION": "."}"#)]
    fn test_venv_at_workspace_root_aborts_without_deleting(#[case] document: &str) {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        let config_file = workspace.path(WorkspacePath::ConfigFile);
        fs::write(&config_file, document).unwrap();
        let source = temp.path().join("src/app.py");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "print('hi')").unwrap();
        let runner = ScriptedRunner::new(healthy_uv);
        let uv = Uv::new(&runner, &Offline, test_settings());

        let failure = Pipeline::new(&workspace, uv, options_without_probe())
            .run()
            .unwrap_err();

        assert_eq!(failure.step, Step::CreateVenv);
        assert!(format!("{:#}", failure.error).contains("Refusing to use"));
        assert!(config_file.exists());
        assert!(source.exists());
        assert_eq!(runner.count("uv venv"), 0);
    }

    #[test]
    fn test_venv_override_is_respected() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path(), None);
        let runner = ScriptedRunner::new(healthy_uv);
        let uv = Uv::new(&runner, &Offline, test_settings());
        let options = SetupOptions {
            venv: Some(PathBuf::from("custom-env")),
            python: Some("3.11".to_string()),
            ..options_without_probe()
        };

        let report = Pipeline::new(&workspace, uv, options).run().unwrap();

        assert_eq!(report.venv, temp.path().join("custom-env"));
        assert!(Path::new(&report.venv).is_dir());
        assert_eq!(runner.count("uv venv --python 3.11"), 1);
    }
}
