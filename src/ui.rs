use anstyle::{AnsiColor, Style};
use is_terminal::IsTerminal;
use regex::Regex;
use std::fmt::Display;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

const LABEL_WIDTH: usize = 9;

/// Severity of a user-facing log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "Debug",
            Level::Info => "Info",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Critical => "Critical",
        }
    }

    fn style(self) -> Style {
        let style = Style::new().bold();
        match self {
            Level::Debug => style.fg_color(Some(AnsiColor::BrightBlack.into())),
            Level::Info => style.fg_color(Some(AnsiColor::Blue.into())),
            Level::Warning => style.fg_color(Some(AnsiColor::Yellow.into())),
            Level::Error => style.fg_color(Some(AnsiColor::Red.into())),
            Level::Critical => style
                .fg_color(Some(AnsiColor::BrightRed.into()))
                .underline(),
        }
    }

    fn uses_stderr(self) -> bool {
        matches!(self, Level::Warning | Level::Error | Level::Critical)
    }
}

static THRESHOLD: AtomicU8 = AtomicU8::new(Level::Info as u8);

/// Show debug lines (`true`) or start at info (`false`).
pub fn set_verbose(verbose: bool) {
    let level = if verbose { Level::Debug } else { Level::Info };
    THRESHOLD.store(level as u8, Ordering::Relaxed);
}

pub fn enabled(level: Level) -> bool {
    level as u8 >= THRESHOLD.load(Ordering::Relaxed)
}

fn step_style() -> Style {
    Style::new().bold().fg_color(Some(AnsiColor::Cyan.into()))
}

/// Split a leading `[n/m]` step marker from the rest of the message.
fn split_step_prefix(message: &str) -> Option<(&str, &str)> {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    let regex = PREFIX
        .get_or_init(|| Regex::new(r"^(\[\d+/\d+\])\s*").expect("step prefix pattern is valid"));
    let captures = regex.captures(message)?;
    let prefix = captures.get(1)?.as_str();
    let rest = &message[captures.get(0)?.end()..];
    Some((prefix, rest))
}

/// Format a log line the way it is written to the terminal.
pub(crate) fn render(level: Level, message: &str, use_color: bool) -> String {
    let paint = |style: Style, text: &str| {
        if use_color {
            format!("{}{text}{}", style.render(), style.render_reset())
        } else {
            text.to_string()
        }
    };

    let padded_label = format!("{:>width$}", level.label(), width = LABEL_WIDTH);
    let mut rendered = String::new();
    for (idx, line) in message.split('\n').enumerate() {
        if idx == 0 {
            rendered.push_str(&paint(level.style(), &padded_label));
            rendered.push(' ');
            match split_step_prefix(line) {
                Some((prefix, rest)) => {
                    rendered.push_str(&paint(step_style(), prefix));
                    rendered.push(' ');
                    rendered.push_str(rest);
                }
                None => rendered.push_str(line),
            }
        } else {
            rendered.push('\n');
            rendered.push_str(&format!("{:>width$} {line}", "", width = LABEL_WIDTH));
        }
    }
    rendered
}

fn supports_color(stderr: bool) -> bool {
    let is_tty = if stderr {
        io::stderr().is_terminal()
    } else {
        io::stdout().is_terminal()
    };
    is_tty && std::env::var_os("NO_COLOR").is_none()
}

fn emit(level: Level, message: &str) {
    if !enabled(level) {
        return;
    }

    let stderr = level.uses_stderr();
    let line = render(level, message, supports_color(stderr));
    let mut handle: Box<dyn Write> = if stderr {
        Box::new(io::stderr().lock())
    } else {
        Box::new(io::stdout().lock())
    };
    let _ = writeln!(handle, "{line}");
    let _ = handle.flush();
}

pub fn debug(message: impl Display) {
    emit(Level::Debug, &message.to_string());
}

pub fn info(message: impl Display) {
    emit(Level::Info, &message.to_string());
}

pub fn warn(message: impl Display) {
    emit(Level::Warning, &message.to_string());
}

pub fn error(message: impl Display) {
    emit(Level::Error, &message.to_string());
}

pub fn critical(message: impl Display) {
    emit(Level::Critical, &message.to_string());
}

/// Message text carrying a `[position/total]` step marker.
pub fn step(position: usize, total: usize, message: impl Display) -> String {
    format!("[{position}/{total}] {message}")
}

pub fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 60 {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    } else if duration.as_secs_f64() >= 1.0 {
        format!("{:.2}s", duration.as_secs_f64())
    } else if duration.as_millis() >= 1 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}µs", duration.as_micros())
    }
}
