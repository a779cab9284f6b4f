//! Merged configuration introspection through the compose tool.

use docket_common::config::ComposeProgram;
use docket_common::error::{DocketError, Result};
use docket_compose::model::ComposeConfig;

use crate::cancel::CancellationToken;
use crate::process::{CommandRunner, CommandSpec, IoMode};

/// Builds `<compose> <leading args> --file f1 --file f2 …`.
pub fn base_command<S: AsRef<str>>(compose: &ComposeProgram, files: &[S]) -> CommandSpec {
    CommandSpec::new(&compose.program)
        .args(compose.leading_args.iter().cloned())
        .args(
            files
                .iter()
                .flat_map(|f| ["--file".to_owned(), f.as_ref().to_owned()]),
        )
}

/// Asks the compose tool to merge `files` and returns the merged text.
///
/// # Errors
///
/// Returns [`DocketError::ConfigInvalid`] carrying the tool's output when it
/// rejects the files, or the runner's error if it could not be invoked.
pub fn merged_text(
    runner: &dyn CommandRunner,
    base: &CommandSpec,
    cancel: &CancellationToken,
) -> Result<String> {
    let spec = base.clone().args(["config"]);
    let out = runner.run(&spec, IoMode::Captured, cancel)?;
    if !out.success() {
        tracing::debug!(command = %spec, code = ?out.code, "compose config rejected");
        return Err(DocketError::ConfigInvalid {
            message: out.combined(),
        });
    }
    Ok(out.stdout)
}

/// Runs `config` with `base` and parses the merged result.
///
/// # Errors
///
/// Returns [`DocketError::ConfigInvalid`] if the tool fails or its output
/// is not a compose document.
pub fn merge_and_parse(
    runner: &dyn CommandRunner,
    base: &CommandSpec,
    cancel: &CancellationToken,
) -> Result<ComposeConfig> {
    let text = merged_text(runner, base, cancel)?;
    let config = ComposeConfig::parse(&text)?;
    tracing::debug!(services = config.services.len(), "merged configuration parsed");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::process::CommandOutput;

    struct OneShot {
        output: CommandOutput,
        seen: Mutex<Option<CommandSpec>>,
    }

    impl OneShot {
        fn new(output: CommandOutput) -> Self {
            Self {
                output,
                seen: Mutex::new(None),
            }
        }
    }

    impl CommandRunner for OneShot {
        fn run(
            &self,
            spec: &CommandSpec,
            io: IoMode,
            _cancel: &CancellationToken,
        ) -> Result<CommandOutput> {
            assert_eq!(io, IoMode::Captured);
            *self.seen.lock().expect("lock") = Some(spec.clone());
            Ok(self.output.clone())
        }
    }

    #[test]
    fn base_command_places_leading_args_first() {
        let compose = ComposeProgram::parse("docker compose").expect("parse");
        let spec = base_command(&compose, &["docket.yaml", "docket.ci.yaml"]);
        assert_eq!(
            spec.argv(),
            vec![
                "docker",
                "compose",
                "--file",
                "docket.yaml",
                "--file",
                "docket.ci.yaml"
            ]
        );
    }

    #[test]
    fn parses_merged_stdout() {
        let runner = OneShot::new(CommandOutput::ok(
            "services:\n  app:\n    image: alpine\n  db:\n    image: postgres\n",
        ));
        let base = base_command(&ComposeProgram::default(), &["docket.yaml"]);
        let config =
            merge_and_parse(&runner, &base, &CancellationToken::new()).expect("should parse");

        assert_eq!(config.services.len(), 2);
        let seen = runner.seen.lock().expect("lock").clone().expect("invoked");
        assert_eq!(
            seen.argv(),
            vec!["docker-compose", "--file", "docket.yaml", "config"]
        );
    }

    #[test]
    fn tool_failure_carries_output_verbatim() {
        let runner = OneShot::new(CommandOutput::failed(
            1,
            "ERROR: services.app.image must be a string\n",
        ));
        let base = base_command(&ComposeProgram::default(), &["docket.yaml"]);
        let err = merge_and_parse(&runner, &base, &CancellationToken::new()).unwrap_err();
        match err {
            DocketError::ConfigInvalid { message } => {
                assert_eq!(message, "ERROR: services.app.image must be a string\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unparseable_output_is_invalid() {
        let runner = OneShot::new(CommandOutput::ok("services: [not, a, map]\n"));
        let base = base_command(&ComposeProgram::default(), &["docket.yaml"]);
        let err = merge_and_parse(&runner, &base, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, DocketError::ConfigInvalid { .. }), "got: {err}");
    }
}
