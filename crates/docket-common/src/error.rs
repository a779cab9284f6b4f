//! Unified error type for the docket workspace.
//!
//! Every fallible operation in the compose logic, the runtime session, and
//! the SDK reports one of these variants. The `dkt` binary converts them to
//! `anyhow` at the edge.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DocketError {
    /// No environment definition file matched the prefix and mode.
    #[error("no matching docket files found: prefix={prefix}, mode={mode}")]
    NoMatchingFiles {
        /// File-name prefix that was searched for.
        prefix: String,
        /// Mode that was searched for.
        mode: String,
    },

    /// The compose tool rejected the merged configuration, or its output
    /// could not be parsed.
    #[error("invalid compose configuration: {message}")]
    ConfigInvalid {
        /// Diagnostic text, including the tool's own output when available.
        message: String,
    },

    /// More than one service is labeled as the test runner.
    #[error("multiple test services found (at least \"{first}\" and \"{second}\")")]
    MultipleTestServices {
        /// First conflicting service, in sorted name order.
        first: String,
        /// Second conflicting service, in sorted name order.
        second: String,
    },

    /// A service carries a role label with an unknown value.
    #[error("unrecognized docket label on service \"{service}\": \"{key}\" : \"{value}\"")]
    UnrecognizedRoleLabel {
        /// Service carrying the label.
        service: String,
        /// Label key.
        key: String,
        /// Offending label value.
        value: String,
    },

    /// The legacy layout needs exactly one cache root but several were configured.
    #[error("multiple dependency cache roots are not supported: {roots:?}")]
    MultipleCacheRoots {
        /// The configured roots.
        roots: Vec<PathBuf>,
    },

    /// The package directory is not below any configured cache root.
    #[error("could not find package name: dir={dir:?} roots={roots:?}")]
    NoMatchingRoot {
        /// Package directory being resolved.
        dir: PathBuf,
        /// Roots that were searched.
        roots: Vec<PathBuf>,
    },

    /// The compose tool did not report a published port.
    #[error("port not found for {service}:{port}: {output:?}")]
    PortNotFound {
        /// Service that was queried.
        service: String,
        /// Container port that was queried.
        port: u16,
        /// Trimmed tool output.
        output: String,
    },

    /// The test runner exited unsuccessfully inside the container.
    #[error("failed to exec tests in service \"{service}\" (exit code {code:?})")]
    RemoteTestExecFailed {
        /// Service the tests ran in.
        service: String,
        /// Exit code reported by the compose tool, if any.
        code: Option<i32>,
    },

    /// An external command exited unsuccessfully.
    #[error("command {command:?} failed (exit code {code:?}): {output}")]
    CommandFailed {
        /// Full argument vector of the command.
        command: Vec<String>,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
        /// Captured output, empty when output was streamed.
        output: String,
    },

    /// A required binary is not on `PATH`.
    #[error("{binary} not found on PATH")]
    ToolNotFound {
        /// Name of the missing binary.
        binary: String,
    },

    /// Probing the language toolchain failed.
    #[error("toolchain probe {command:?} failed: {message}")]
    Probe {
        /// Command that was run.
        command: Vec<String>,
        /// Description of the failure.
        message: String,
    },

    /// The session is not in a state that allows the operation.
    #[error("invalid session state: cannot {operation} while {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// Current state name.
        state: String,
    },

    /// An operation needed an active mode but none is set.
    #[error("no active test config")]
    NoActiveMode,

    /// An external invocation was cancelled.
    #[error("operation cancelled: {command:?}")]
    Cancelled {
        /// Command that was running when cancellation was observed.
        command: Vec<String>,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("yaml error: {source}")]
    Yaml {
        /// Underlying YAML error.
        #[from]
        source: serde_yaml::Error,
    },

    /// JSON deserialization failed.
    #[error("json error: {source}")]
    Json {
        /// Underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}

impl DocketError {
    /// Returns the exit code that should be propagated to the shell.
    ///
    /// Failures of a delegated test run pass the tool's code through
    /// unchanged; everything else maps to the internal error code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::RemoteTestExecFailed { code: Some(code), .. }
            | Self::CommandFailed { code: Some(code), .. } => *code,
            _ => crate::constants::INTERNAL_ERROR_EXIT_CODE,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DocketError>;
