//! The docket session: one environment, brought up and torn down around a
//! test run.
//!
//! [`Session::create`] resolves the environment files, merges them through
//! the compose tool, locates the caller's dependencies, writes the source
//! mounts fragment and finds the test service. Every later operation runs
//! the compose tool with the same `--file` arguments.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use docket_common::config::DocketConfig;
use docket_common::constants::{MOUNTS_FILE_PREFIX, MOUNTS_FILE_SUFFIX};
use docket_common::error::{DocketError, Result};
use docket_compose::model::ComposeConfig;
use docket_compose::{files, mounts, roles, selection};
use regex::Regex;

use crate::cancel::CancellationToken;
use crate::cleanup::Cleanup;
use crate::introspect;
use crate::locator::{self, DependencyProbe};
use crate::process::{CommandRunner, CommandSpec, IoMode};

#[allow(clippy::expect_used)]
static PORT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(\d+)$").expect("valid port regex"));

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; the environment has not been started.
    Ready,
    /// `up` succeeded.
    Up,
    /// `down` succeeded.
    Down,
    /// `pull` or `up` failed; only teardown remains possible.
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The test being run and the selection state of the current runner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestInvocation {
    /// Hierarchical test name, `/`-separated.
    pub name: String,
    /// Selection pattern the current run was started with, possibly empty.
    pub selection: String,
    /// Whether the current run is verbose.
    pub verbose: bool,
}

impl TestInvocation {
    /// An invocation of `name` with no prior selection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A prepared docket environment.
pub struct Session {
    config: DocketConfig,
    mode: String,
    runner: Arc<dyn CommandRunner>,
    cancel: CancellationToken,
    base: CommandSpec,
    files: Vec<String>,
    merged: ComposeConfig,
    mounts_file: Option<PathBuf>,
    test_service: Option<String>,
    state: SessionState,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.mode)
            .field("base", &self.base)
            .field("mounts_file", &self.mounts_file)
            .field("test_service", &self.test_service)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Prepares a session for the mode in `config`, working in `dir`.
    ///
    /// The returned [`Cleanup`] is valid whether or not creation succeeded
    /// and removes whatever was written before a failure.
    pub fn create(
        config: DocketConfig,
        runner: Arc<dyn CommandRunner>,
        probe: &dyn DependencyProbe,
        dir: &Path,
        cancel: CancellationToken,
    ) -> (Result<Self>, Cleanup) {
        let mut cleanup = Cleanup::new();
        let session = Self::prepare(config, runner, probe, dir, cancel, &mut cleanup);
        if let Err(e) = &session {
            tracing::debug!(error = %e, "session creation failed");
        }
        (session, cleanup)
    }

    fn prepare(
        config: DocketConfig,
        runner: Arc<dyn CommandRunner>,
        probe: &dyn DependencyProbe,
        dir: &Path,
        cancel: CancellationToken,
        cleanup: &mut Cleanup,
    ) -> Result<Self> {
        let mode = config.mode.clone().ok_or(DocketError::NoActiveMode)?;

        let files = files::find_in_dir(dir, &config.prefix, &mode)?;
        if files.is_empty() {
            return Err(DocketError::NoMatchingFiles {
                prefix: config.prefix.clone(),
                mode,
            });
        }

        let mut base = introspect::base_command(&config.compose, &files).current_dir(dir);
        let merged = introspect::merge_and_parse(runner.as_ref(), &base, &cancel)?;

        let package = probe.package(&cancel)?;
        let roots = probe.cache_roots(&cancel)?;
        let location = locator::locate(&package, &roots)?;

        let mut mounts_file = None;
        if let Some(source_mounts) = mounts::build(&merged, &location, &config.role_label)? {
            let path = write_mounts_file(dir, &source_mounts.to_fragment())?;
            if config.keep_mounts_file {
                tracing::info!(path = %path.display(), "keeping source mounts file");
            } else {
                let removable = path.clone();
                cleanup.push("remove source mounts file", move || {
                    std::fs::remove_file(&removable).map_err(|e| DocketError::Io {
                        path: removable.clone(),
                        source: e,
                    })
                });
            }
            tracing::debug!(
                path = %path.display(),
                services = ?source_mounts.services,
                "source mounts written"
            );
            base = base.args(["--file".to_owned(), path.to_string_lossy().into_owned()]);
            mounts_file = Some(path);
        }

        let test_service = roles::find_test_service(&merged, &config.role_label)?;

        tracing::info!(
            mode = %mode,
            files = ?files,
            test_service = ?test_service,
            "docket session ready"
        );
        Ok(Self {
            config,
            mode,
            runner,
            cancel,
            base,
            files,
            merged,
            mounts_file,
            test_service,
            state: SessionState::Ready,
        })
    }

    /// Active mode.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Environment files, in the order they are passed to the compose tool.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Merged configuration as parsed at creation.
    pub const fn merged(&self) -> &ComposeConfig {
        &self.merged
    }

    /// Path of the source mounts fragment, if one was written.
    pub fn mounts_file(&self) -> Option<&Path> {
        self.mounts_file.as_deref()
    }

    /// Service the tests are delegated to, if any.
    pub fn test_service(&self) -> Option<&str> {
        self.test_service.as_deref()
    }

    /// The compose command with every `--file` argument of this session.
    pub const fn base_command(&self) -> &CommandSpec {
        &self.base
    }

    fn ensure_usable(&self, operation: &'static str) -> Result<()> {
        if self.state == SessionState::Failed {
            return Err(DocketError::InvalidState {
                operation,
                state: self.state.to_string(),
            });
        }
        Ok(())
    }

    fn compose<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base.clone().args(args)
    }

    fn streamed(&self, spec: &CommandSpec) -> Result<()> {
        tracing::debug!(command = %spec, "running compose");
        let out = self.runner.run(spec, IoMode::Streamed, &self.cancel)?;
        if out.success() {
            Ok(())
        } else {
            Err(DocketError::CommandFailed {
                command: spec.argv(),
                code: out.code,
                output: out.combined(),
            })
        }
    }

    fn track(&mut self, result: Result<()>, on_success: SessionState) -> Result<()> {
        match result {
            Ok(()) => {
                self.state = on_success;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    /// Pulls the service images, passing `extra_args` to the tool.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::InvalidState`] after a failure, or the tool's
    /// failure (which marks the session failed).
    pub fn pull(&mut self, extra_args: &[String]) -> Result<()> {
        self.ensure_usable("pull")?;
        tracing::info!(mode = %self.mode, "pulling images");
        let spec = self.compose(std::iter::once("pull".to_owned()).chain(extra_args.iter().cloned()));
        let result = self.streamed(&spec);
        let state = self.state;
        self.track(result, state)
    }

    /// Starts the environment in the background.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::InvalidState`] after a failure, or the tool's
    /// failure (which marks the session failed).
    pub fn up(&mut self) -> Result<()> {
        self.ensure_usable("up")?;
        tracing::info!(mode = %self.mode, "starting environment");
        let spec = self.compose(["up", "-d"]);
        let result = self.streamed(&spec);
        self.track(result, SessionState::Up)
    }

    /// Stops and removes the environment. Allowed in every state.
    ///
    /// # Errors
    ///
    /// Returns the tool's failure.
    pub fn down(&mut self) -> Result<()> {
        tracing::info!(mode = %self.mode, "stopping environment");
        let spec = self.compose(["down"]);
        self.streamed(&spec)?;
        if self.state != SessionState::Failed {
            self.state = SessionState::Down;
        }
        Ok(())
    }

    /// Returns the merged configuration text as the tool prints it.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::ConfigInvalid`] if the tool fails.
    pub fn config(&self) -> Result<String> {
        introspect::merged_text(self.runner.as_ref(), &self.base, &self.cancel)
    }

    /// Looks up the host port published for `service`'s `container_port`.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::CommandFailed`] if the tool exits non-zero and
    /// [`DocketError::PortNotFound`] if its stdout carries no port.
    pub fn port(&self, service: &str, container_port: u16) -> Result<u16> {
        self.ensure_usable("port")?;
        let spec = self.compose(["port".to_owned(), service.to_owned(), container_port.to_string()]);
        let out = self.runner.run(&spec, IoMode::Captured, &self.cancel)?;
        if !out.success() {
            return Err(DocketError::CommandFailed {
                command: spec.argv(),
                code: out.code,
                output: out.combined(),
            });
        }

        // stderr carries tool warnings; the mapping is the last stdout line
        let published = PORT_SUFFIX
            .captures(out.stdout.trim())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u16>().ok())
            .ok_or_else(|| DocketError::PortNotFound {
                service: service.to_owned(),
                port: container_port,
                output: out.combined().trim().to_owned(),
            })?;
        tracing::debug!(service, container_port, published, "published port");
        Ok(published)
    }

    /// Runs the test locally, or re-runs it inside the test service.
    ///
    /// Without a test service `local_fn` is called exactly once. With one,
    /// the runner is executed in that service with a selection pattern that
    /// matches only `invocation`, and `local_fn` is never called.
    ///
    /// # Errors
    ///
    /// Returns [`DocketError::InvalidState`] after a failure, or
    /// [`DocketError::RemoteTestExecFailed`] if the remote run fails.
    pub fn run_or_delegate<F>(&self, invocation: &TestInvocation, local_fn: F) -> Result<()>
    where
        F: FnOnce(),
    {
        self.ensure_usable("run tests")?;
        let Some(service) = &self.test_service else {
            tracing::debug!(test = %invocation.name, "running test locally");
            local_fn();
            return Ok(());
        };

        let pattern = selection::translate(&invocation.name, &invocation.selection);
        let runner = &self.config.runner;
        let mut args = vec!["exec".to_owned(), "-T".to_owned(), service.clone()];
        args.push(runner.program.clone());
        args.extend(runner.args.iter().cloned());
        args.push(runner.run_flag.clone());
        args.push(pattern);
        args.extend(runner.no_cache_args.iter().cloned());
        if invocation.verbose {
            args.push(runner.verbose_flag.clone());
        }

        let spec = self.compose(args);
        tracing::info!(test = %invocation.name, service = %service, "delegating test to service");
        let out = self.runner.run(&spec, IoMode::Streamed, &self.cancel)?;
        if out.success() {
            Ok(())
        } else {
            Err(DocketError::RemoteTestExecFailed {
                service: service.clone(),
                code: out.code,
            })
        }
    }

    /// Runs arbitrary compose arguments with this session's files and the
    /// caller's terminal, returning the tool's exit code unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool could not be run at all.
    pub fn command(&self, args: &[String]) -> Result<Option<i32>> {
        let spec = self.compose(args.iter().cloned());
        tracing::debug!(command = %spec, "passing through to compose");
        let out = self.runner.run(&spec, IoMode::Interactive, &self.cancel)?;
        Ok(out.code)
    }
}

fn write_mounts_file(dir: &Path, fragment: &ComposeConfig) -> Result<PathBuf> {
    let io_err = |e| DocketError::Io {
        path: dir.to_path_buf(),
        source: e,
    };
    let yaml = fragment.to_yaml()?;
    let mut file = tempfile::Builder::new()
        .prefix(MOUNTS_FILE_PREFIX)
        .suffix(MOUNTS_FILE_SUFFIX)
        .tempfile_in(dir)
        .map_err(io_err)?;
    file.write_all(yaml.as_bytes()).map_err(io_err)?;
    let (_, path) = file.keep().map_err(|e| io_err(e.error))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names() {
        assert_eq!(SessionState::Ready.to_string(), "ready");
        assert_eq!(SessionState::Failed.to_string(), "failed");
    }

    #[test]
    fn port_suffix_takes_the_last_number() {
        let caps = PORT_SUFFIX.captures("0.0.0.0:49153").expect("match");
        assert_eq!(&caps[1], "49153");
        assert!(PORT_SUFFIX.captures("[::]:8080\nextra").is_none());
    }

    #[test]
    fn mounts_file_is_named_and_kept() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_mounts_file(dir.path(), &ComposeConfig::default()).expect("write");
        let name = path.file_name().expect("name").to_string_lossy().into_owned();
        assert!(name.starts_with(MOUNTS_FILE_PREFIX), "got: {name}");
        assert!(name.ends_with(MOUNTS_FILE_SUFFIX), "got: {name}");
        assert!(path.exists());
        assert_eq!(path.parent(), Some(dir.path()));
    }
}
