use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fmt;

use super::first_success;
use crate::process::{Invocation, Runner};
use crate::ui;
use crate::uv::Uv;

/// Ways of reaching a pip installer, in the order they are tried.
pub(crate) const PIP_ALIASES: &[&[&str]] = &[
    &["pip"],
    &["pip3"],
    &["python", "-m", "pip"],
    &["python3", "-m", "pip"],
    &["python", "-m", "pip3"],
    &["python3", "-m", "pip3"],
];

/// A command prefix that runs pip, such as `python3 -m pip`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PipAlias {
    program: String,
    args: Vec<String>,
}

impl PipAlias {
    fn from_parts(parts: &[&str]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }

    pub(crate) fn command<I, S>(&self, extra: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Invocation::new(&self.program)
            .args(&self.args)
            .args(extra)
    }
}

impl fmt::Display for PipAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Probe every alias with `--version` and keep the first that answers.
pub(crate) fn find_pip_alias(runner: &dyn Runner) -> Option<PipAlias> {
    ui::debug("Checking for pip alias...");
    let candidates: Vec<PipAlias> = PIP_ALIASES
        .iter()
        .filter_map(|parts| PipAlias::from_parts(parts))
        .collect();

    let found = first_success(&candidates, |alias| {
        runner
            .run(&alias.command(["--version"]))
            .map_err(anyhow::Error::from)
    })
    .map(|(alias, _)| alias.clone());

    match &found {
        Some(alias) => ui::debug(format!("Found pip alias ({alias})")),
        None => ui::warn("No pip alias found"),
    }
    found
}

pub(crate) fn install(uv: &Uv) -> Result<()> {
    let alias = find_pip_alias(uv.runner()).context("No pip installation available")?;
    uv.runner()
        .run(&alias.command(["install", "uv"]))
        .with_context(|| format!("`{alias} install uv` failed"))?;
    Ok(())
}

pub(crate) fn upgrade(uv: &Uv) -> Result<()> {
    let alias = find_pip_alias(uv.runner()).context("No pip installation available")?;
    uv.runner()
        .run(&alias.command(["install", "--upgrade", "uv"]))
        .with_context(|| format!("`{alias} install --upgrade uv` failed"))?;
    Ok(())
}
