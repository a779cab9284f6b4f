//! Configuration model for a docket session.
//!
//! All knobs that influence orchestration (label key, toggles, compose
//! command, remote runner) live in [`DocketConfig`]. It is built from the
//! `DOCKET_*` environment variables with [`DocketConfig::from_env`] and then
//! passed explicitly to the session.

use serde::{Deserialize, Serialize};

use crate::constants;

/// The compose command: a program plus any arguments that precede the
/// per-session `--file` arguments (e.g. `docker` + `compose`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeProgram {
    /// Binary to execute.
    pub program: String,
    /// Arguments placed before everything else.
    pub leading_args: Vec<String>,
}

impl ComposeProgram {
    /// Parses a whitespace-separated command line such as `docker compose`.
    ///
    /// Returns `None` for a blank string.
    pub fn parse(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_owned);
        let program = words.next()?;
        Some(Self {
            program,
            leading_args: words.collect(),
        })
    }
}

impl Default for ComposeProgram {
    fn default() -> Self {
        Self {
            program: constants::DEFAULT_COMPOSE_PROGRAM.into(),
            leading_args: Vec::new(),
        }
    }
}

/// How to re-invoke the test runner inside the test service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Runner binary inside the container.
    pub program: String,
    /// Arguments selecting the test verb.
    pub args: Vec<String>,
    /// Flag that takes the selection pattern.
    pub run_flag: String,
    /// Arguments that disable result caching.
    pub no_cache_args: Vec<String>,
    /// Flag forwarded when the current run is verbose.
    pub verbose_flag: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "go".into(),
            args: vec!["test".into()],
            run_flag: "-run".into(),
            no_cache_args: vec!["-count=1".into()],
            verbose_flag: "-v".into(),
        }
    }
}

/// Root configuration for one docket session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocketConfig {
    /// File-name prefix of the environment definition files.
    pub prefix: String,
    /// Active mode; `None` means docket is inactive.
    pub mode: Option<String>,
    /// Label key carrying the service role.
    pub role_label: String,
    /// Run `pull` before `up`.
    pub pull: bool,
    /// Extra arguments for `pull`.
    pub pull_opts: Vec<String>,
    /// Run `down` after the tests.
    pub down: bool,
    /// Leave the source mounts fragment on disk after cleanup.
    pub keep_mounts_file: bool,
    /// Compose command.
    pub compose: ComposeProgram,
    /// Remote test runner.
    pub runner: RunnerConfig,
}

impl Default for DocketConfig {
    fn default() -> Self {
        Self {
            prefix: constants::DEFAULT_PREFIX.into(),
            mode: None,
            role_label: constants::DEFAULT_ROLE_LABEL.into(),
            pull: false,
            pull_opts: Vec::new(),
            down: false,
            keep_mounts_file: false,
            compose: ComposeProgram::default(),
            runner: RunnerConfig::default(),
        }
    }
}

impl DocketConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// an environment variable if it is set.
    ///
    /// Toggles are enabled by any non-empty value. A blank prefix falls back
    /// to the default, a blank mode leaves docket inactive.
    ///
    /// The role label and the [`RunnerConfig`] are not read from the
    /// environment; they keep their defaults unless the caller sets them on
    /// the returned value before handing it to the harness.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let config = Self {
            prefix: non_empty(constants::ENV_PREFIX).unwrap_or(defaults.prefix),
            mode: non_empty(constants::ENV_MODE),
            role_label: defaults.role_label,
            pull: non_empty(constants::ENV_PULL).is_some(),
            pull_opts: non_empty(constants::ENV_PULL_OPTS)
                .map(|v| v.split_whitespace().map(str::to_owned).collect())
                .unwrap_or_default(),
            down: non_empty(constants::ENV_DOWN).is_some(),
            keep_mounts_file: non_empty(constants::ENV_KEEP_MOUNTS_FILE).is_some(),
            compose: non_empty(constants::ENV_COMPOSE)
                .and_then(|v| ComposeProgram::parse(&v))
                .unwrap_or(defaults.compose),
            runner: defaults.runner,
        };
        tracing::debug!(
            prefix = %config.prefix,
            mode = ?config.mode,
            pull = config.pull,
            down = config.down,
            "loaded docket configuration"
        );
        config
    }

    /// Returns a copy with the given mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Returns a copy with the given prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }
}
