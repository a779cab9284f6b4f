//! Running a test inside its docket environment.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docket_common::config::DocketConfig;
use docket_common::constants::DEFAULT_PREFIX;
use docket_common::error::{DocketError, Result};
use docket_runtime::cancel::CancellationToken;
use docket_runtime::locator::{DependencyProbe, GoToolchain};
use docket_runtime::process::{CommandRunner, SystemRunner};
use docket_runtime::session::{Session, TestInvocation};

use crate::context::DocketContext;
use crate::flags::RunnerFlags;

/// Runs `test` in the environment described by the `docket*` files of the
/// current directory.
///
/// Without `DOCKET_MODE` the test simply runs. Otherwise the environment is
/// brought up (after a pull if `DOCKET_PULL` is set), the test runs locally
/// or in the test service, and the environment is brought down if
/// `DOCKET_DOWN` is set.
///
/// # Errors
///
/// Returns the first error of the session, the delegated run or the
/// cleanup.
pub fn run<F>(test_name: &str, test: F) -> Result<()>
where
    F: FnOnce(DocketContext<'_>),
{
    run_prefix(DEFAULT_PREFIX, test_name, test)
}

/// Like [`run`], but only considers files starting with `prefix`.
///
/// # Errors
///
/// See [`run`].
pub fn run_prefix<F>(prefix: &str, test_name: &str, test: F) -> Result<()>
where
    F: FnOnce(DocketContext<'_>),
{
    let config = DocketConfig::from_env().with_prefix(prefix);
    if config.mode.is_none() {
        test(DocketContext::inactive());
        return Ok(());
    }

    let dir = std::env::current_dir().map_err(|e| DocketError::Io {
        path: PathBuf::from("."),
        source: e,
    })?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::new());
    let probe = GoToolchain::new(Arc::clone(&runner), &dir);
    let flags = RunnerFlags::from_env();
    let invocation = TestInvocation {
        name: test_name.to_owned(),
        selection: flags.selection,
        verbose: flags.verbose,
    };

    run_with(config, runner, &probe, &dir, &invocation, test)
}

/// Runs `test` with explicit collaborators.
///
/// A panic in `test` still brings the environment down when `down` is set
/// and runs the cleanup before it resumes.
///
/// # Errors
///
/// See [`run`].
pub fn run_with<F>(
    config: DocketConfig,
    runner: Arc<dyn CommandRunner>,
    probe: &dyn DependencyProbe,
    dir: &Path,
    invocation: &TestInvocation,
    test: F,
) -> Result<()>
where
    F: FnOnce(DocketContext<'_>),
{
    if config.mode.is_none() {
        test(DocketContext::inactive());
        return Ok(());
    }

    let (pull, pull_opts, down) = (config.pull, config.pull_opts.clone(), config.down);
    let (session, mut cleanup) =
        Session::create(config, runner, probe, dir, CancellationToken::new());

    let mut panicked = None;
    let outcome = session.and_then(|mut session| {
        if pull {
            session.pull(&pull_opts)?;
        }
        session.up()?;

        let ran = {
            let ctx = DocketContext::active(&session);
            panic::catch_unwind(AssertUnwindSafe(|| {
                session.run_or_delegate(invocation, || test(ctx))
            }))
            .unwrap_or_else(|payload| {
                panicked = Some(payload);
                Ok(())
            })
        };

        let stopped = if down {
            session.down()
        } else {
            tracing::info!(mode = %session.mode(), "leaving compose app running");
            Ok(())
        };
        ran.and(stopped)
    });

    let cleaned = cleanup.run();
    let outcome = outcome.and(cleaned);
    if let Some(payload) = panicked {
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "teardown after a panicking test failed");
        }
        panic::resume_unwind(payload);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_mode_runs_the_test_directly() {
        struct Unreachable;
        impl CommandRunner for Unreachable {
            fn run(
                &self,
                _spec: &docket_runtime::process::CommandSpec,
                _io: docket_runtime::process::IoMode,
                _cancel: &CancellationToken,
            ) -> Result<docket_runtime::process::CommandOutput> {
                panic!("no command should run without a mode");
            }
        }

        let runner: Arc<dyn CommandRunner> = Arc::new(Unreachable);
        let probe = GoToolchain::new(Arc::clone(&runner), ".");
        let mut seen_mode = Some("unset");
        run_with(
            DocketConfig::default(),
            runner,
            &probe,
            Path::new("."),
            &TestInvocation::new("TestInactive"),
            |ctx| seen_mode = ctx.mode().map(|_| "set"),
        )
        .expect("inactive run");
        assert_eq!(seen_mode, None);
    }
}
