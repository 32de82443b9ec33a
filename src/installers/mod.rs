use anyhow::{bail, Context, Result};
use std::fmt;

use crate::ui;
use crate::uv::Uv;

mod pip;
mod script;

/// Ways of getting uv onto the machine, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallChannel {
    /// Standalone installer script piped to `sh` (not available on Windows)
    Script,
    /// `<pip> install uv`
    Pip,
}

impl fmt::Display for InstallChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallChannel::Script => write!(f, "installer script"),
            InstallChannel::Pip => write!(f, "pip"),
        }
    }
}

/// Ways of bringing an existing uv up to date, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateChannel {
    /// `uv self update`
    SelfUpdate,
    /// `<pip> install --upgrade uv`
    Pip,
}

impl fmt::Display for UpdateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateChannel::SelfUpdate => write!(f, "uv self update"),
            UpdateChannel::Pip => write!(f, "pip"),
        }
    }
}

pub fn install_channels(script_supported: bool) -> Vec<InstallChannel> {
    if script_supported {
        vec![InstallChannel::Script, InstallChannel::Pip]
    } else {
        vec![InstallChannel::Pip]
    }
}

pub fn update_channels() -> Vec<UpdateChannel> {
    vec![UpdateChannel::SelfUpdate, UpdateChannel::Pip]
}

/// Run `attempt` over `candidates` in order and stop at the first success.
pub(crate) fn first_success<'c, T, R>(
    candidates: &'c [T],
    mut attempt: impl FnMut(&T) -> Result<R>,
) -> Option<(&'c T, R)> {
    for candidate in candidates {
        if let Ok(result) = attempt(candidate) {
            return Some((candidate, result));
        }
    }
    None
}

fn describe<T: fmt::Display>(channels: &[T]) -> String {
    channels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn install(uv: &Uv) -> Result<()> {
    let channels = install_channels(uv.settings().script_channel);

    let installed = first_success(&channels, |channel| {
        ui::info(format!("Installing uv via {channel}..."));
        let result = match channel {
            InstallChannel::Script => script::install(uv),
            InstallChannel::Pip => pip::install(uv),
        }
        .and_then(|()| {
            uv.version()
                .map(|_| ())
                .context("uv is still unavailable after installation")
        });

        match &result {
            Ok(()) => ui::info(format!("Successfully installed uv via {channel}")),
            Err(err) => ui::warn(format!("Failed to install uv via {channel}: {err:#}")),
        }
        result
    });

    if installed.is_none() {
        bail!("Unable to install uv (tried {})", describe(&channels));
    }
    Ok(())
}

pub(crate) fn update(uv: &Uv) -> Result<()> {
    let channels = update_channels();

    let updated = first_success(&channels, |channel| {
        ui::info(format!("Updating uv via {channel}..."));
        let result = match channel {
            UpdateChannel::SelfUpdate => self_update(uv),
            UpdateChannel::Pip => pip::upgrade(uv),
        };

        match &result {
            Ok(()) => ui::info(format!("Successfully updated uv via {channel}")),
            Err(err) => ui::warn(format!("Failed to update uv via {channel}: {err:#}")),
        }
        result
    });

    if updated.is_none() {
        bail!("Unable to update uv (tried {})", describe(&channels));
    }
    Ok(())
}

fn self_update(uv: &Uv) -> Result<()> {
    uv.run(&uv.command(["self", "update"]))?;
    Ok(())
}
