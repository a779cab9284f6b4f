//! External process invocation.
//!
//! Every call docket makes to the compose tool or the toolchain goes
//! through [`CommandRunner`], so sessions can be driven by a scripted runner
//! in tests and by [`SystemRunner`] in production.

use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use docket_common::error::{DocketError, Result};

use crate::cancel::CancellationToken;
use crate::interrupt::InterruptGuard;

const POLL_INTERVAL_MS: u64 = 50;

/// A fully described external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Binary to execute (looked up on `PATH` when not a path).
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Directory to run in; inherits ours when `None`.
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    /// Stdout and stderr are captured, stdin is closed.
    Captured,
    /// Stdout and stderr go to ours, stdin is closed.
    Streamed,
    /// All three streams are ours.
    Interactive,
}

/// Result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` if the child was killed by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty unless [`IoMode::Captured`]).
    pub stdout: String,
    /// Captured stderr (empty unless [`IoMode::Captured`]).
    pub stderr: String,
}

impl CommandOutput {
    /// A successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed output with the given code and stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command exited with code 0.
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Runs external commands.
pub trait CommandRunner: Send + Sync {
    /// Runs `spec` to completion.
    ///
    /// A non-zero exit is not an error at this level; callers inspect
    /// [`CommandOutput::code`].
    ///
    /// # Errors
    ///
    /// Returns an error if the program cannot be found or spawned, or if
    /// `cancel` fires before it exits.
    fn run(
        &self,
        spec: &CommandSpec,
        io: IoMode,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    /// Creates a system runner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn locate_program(program: &str) -> Result<PathBuf> {
    which::which(program).map_err(|_| DocketError::ToolNotFound {
        binary: program.to_owned(),
    })
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<JoinHandle<String>> {
    let mut stream = stream?;
    Some(std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }))
}

fn join_drain(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn wait_for(child: &mut Child, spec: &CommandSpec, cancel: &CancellationToken) -> Result<Option<i32>> {
    let io_err = |e| DocketError::Io {
        path: PathBuf::from(&spec.program),
        source: e,
    };

    loop {
        if let Some(status) = child.try_wait().map_err(io_err)? {
            return Ok(status.code());
        }
        if cancel.is_cancelled() {
            tracing::warn!(command = %spec, "cancelling child process");
            let _ = child.kill();
            let _ = child.wait();
            return Err(DocketError::Cancelled {
                command: spec.argv(),
            });
        }
        std::thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        spec: &CommandSpec,
        io: IoMode,
        cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        if cancel.is_cancelled() {
            return Err(DocketError::Cancelled {
                command: spec.argv(),
            });
        }

        let program = locate_program(&spec.program)?;
        let mut command = Command::new(&program);
        let _ = command.args(&spec.args);
        if let Some(dir) = &spec.current_dir {
            let _ = command.current_dir(dir);
        }
        let _ = match io {
            IoMode::Captured => command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped()),
            IoMode::Streamed => command.stdin(Stdio::null()),
            IoMode::Interactive => &mut command,
        };

        tracing::debug!(command = %spec, ?io, "spawning");
        let _guard = (io != IoMode::Captured).then(InterruptGuard::install);

        let mut child = command.spawn().map_err(|e| DocketError::Io {
            path: program.clone(),
            source: e,
        })?;
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let code = wait_for(&mut child, spec, cancel)?;
        let output = CommandOutput {
            code,
            stdout: join_drain(stdout),
            stderr: join_drain(stderr),
        };
        tracing::debug!(command = %spec, code = ?output.code, "finished");
        Ok(output)
    }
}
