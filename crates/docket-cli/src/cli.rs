//! Command-line definition.

use clap::Parser;
use docket_common::constants::{DEFAULT_PREFIX, ENV_MODE, ENV_PREFIX};

/// dkt — run compose commands in a docket environment.
///
/// Everything after the docket options is passed to the compose tool,
/// preceded by the `--file` arguments of the selected mode.
#[derive(Parser, Debug)]
#[command(name = "dkt", version, about, long_about = None)]
pub struct Cli {
    /// Docket mode to use.
    #[arg(short = 'm', long, env = ENV_MODE)]
    pub mode: Option<String>,

    /// File-name prefix of the docket files.
    #[arg(short = 'P', long, env = ENV_PREFIX, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Arguments for the compose tool.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// The requested mode, ignoring blank values.
    pub fn active_mode(&self) -> Option<&str> {
        self.mode.as_deref().filter(|m| !m.is_empty())
    }
}
