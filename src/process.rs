use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long output is awaited once the command itself has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// A fully described external command: program, arguments, extra environment
/// and optional bytes to feed on stdin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    program: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    stdin: Option<Vec<u8>>,
}

impl Invocation {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_os_str())
    }

    pub fn get_stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("`{program}` was not found on PATH")]
    MissingBinary { program: String },

    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with {status}{}", last_line(.stderr))]
    NonZeroExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {}s", .timeout.as_secs_f64())]
    TimedOut { command: String, timeout: Duration },

    #[error("failed while waiting for `{command}`")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    pub fn is_missing_binary(&self) -> bool {
        matches!(self, ProcessError::MissingBinary { .. })
    }
}

fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| format!(": {line}"))
        .unwrap_or_default()
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

/// Executes invocations. Everything that shells out goes through this seam.
pub trait Runner {
    fn run(&self, invocation: &Invocation) -> Result<Output, ProcessError>;
}

/// Runs invocations as blocking child processes, killing any that outlive the
/// configured timeout.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Runner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<Output, ProcessError> {
        let command_line = invocation.to_string();
        debug!(command = %command_line, "Running command");

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .envs(invocation.envs.iter().map(|(key, value)| (key, value)))
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if self.timeout.is_some() {
            isolate(&mut command);
        }

        let mut child = command.spawn().map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ProcessError::MissingBinary {
                    program: invocation.program.to_string_lossy().into_owned(),
                }
            } else {
                ProcessError::Spawn {
                    command: command_line.clone(),
                    source,
                }
            }
        })?;

        if let (Some(mut pipe), Some(input)) = (child.stdin.take(), invocation.stdin.clone()) {
            thread::spawn(move || {
                // The child may exit without reading everything.
                let _ = pipe.write_all(&input);
            });
        }
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match wait_with_timeout(&mut child, self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                return Err(ProcessError::TimedOut {
                    command: command_line,
                    timeout: self.timeout.unwrap_or_default(),
                });
            }
            Err(source) => {
                return Err(ProcessError::Wait {
                    command: command_line,
                    source,
                });
            }
        };

        let deadline = Instant::now() + DRAIN_GRACE;
        let output = Output {
            stdout: collect(stdout, deadline),
            stderr: collect(stderr, deadline),
        };
        trace!(
            command = %command_line,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "Command finished"
        );

        if status.success() {
            Ok(output)
        } else {
            Err(ProcessError::NonZeroExit {
                command: command_line,
                status: describe_status(status),
                stderr: output.stderr,
            })
        }
    }
}

/// Read `reader` to the end on a helper thread.
fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<String> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = reader.read_to_end(&mut buffer);
        let _ = sender.send(String::from_utf8_lossy(&buffer).into_owned());
    });
    receiver
}

/// A background process that inherited the pipe can keep it open after the
/// command exits; its output is given up at `deadline`.
fn collect(receiver: Option<Receiver<String>>, deadline: Instant) -> String {
    receiver
        .and_then(|receiver| {
            let remaining = deadline.saturating_duration_since(Instant::now());
            receiver.recv_timeout(remaining).ok()
        })
        .unwrap_or_default()
}

/// Returns `Ok(None)` when the child had to be killed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> io::Result<Option<ExitStatus>> {
    let Some(limit) = timeout else {
        return child.wait().map(Some);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= limit {
            terminate(child);
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Start the command in a process group of its own.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

/// Kill the child together with everything it spawned.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // The group id is the child's pid, see `isolate`.
    let group = Pid::from_raw(child.id() as i32);
    if let Err(errno) = killpg(group, Signal::SIGKILL) {
        debug!(%errno, "Failed to kill process group, killing the child only");
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}
