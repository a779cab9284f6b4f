//! `dkt <compose args…>` — run the compose tool inside a docket session.

use std::sync::Arc;

use anyhow::Context as _;
use docket_common::config::DocketConfig;
use docket_common::constants::{ENV_MODE, INTERNAL_ERROR_EXIT_CODE};
use docket_runtime::cancel::CancellationToken;
use docket_runtime::locator::GoToolchain;
use docket_runtime::process::{CommandRunner, SystemRunner};
use docket_runtime::session::Session;

use crate::cli::Cli;

/// Builds the session for the requested mode, hands the arguments to the
/// compose tool and returns its exit code.
///
/// Interrupts are left to the compose tool for the lifetime of the command
/// so the session is always cleaned up.
///
/// # Errors
///
/// Returns an error if no mode is set, the session cannot be created, the
/// tool cannot be started, or cleanup fails.
pub fn execute(cli: Cli) -> anyhow::Result<i32> {
    let Some(mode) = cli.active_mode().map(str::to_owned) else {
        anyhow::bail!("use -m|--mode or set ${ENV_MODE}");
    };

    ctrlc::set_handler(|| tracing::debug!("interrupt left to the compose tool"))
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let dir = std::env::current_dir().context("cannot determine current directory")?;
    let config = DocketConfig::from_env().with_mode(mode).with_prefix(&cli.prefix);
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let probe = GoToolchain::new(Arc::clone(&runner), &dir);

    let (session, mut cleanup) =
        Session::create(config, runner, &probe, &dir, CancellationToken::new());
    let outcome = session.and_then(|session| {
        tracing::debug!(args = ?cli.args, "running compose passthrough");
        session.command(&cli.args)
    });
    let cleaned = cleanup.run();

    let code = outcome?;
    cleaned?;
    Ok(code.unwrap_or(INTERNAL_ERROR_EXIT_CODE))
}
