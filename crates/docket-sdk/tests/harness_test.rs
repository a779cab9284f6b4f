//! End-to-end harness tests with a scripted compose tool.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use docket_common::config::DocketConfig;
use docket_common::error::{DocketError, Result};
use docket_runtime::cancel::CancellationToken;
use docket_runtime::locator::{DependencyProbe, ModuleInfo, PackageInfo};
use docket_runtime::process::{CommandOutput, CommandRunner, CommandSpec, IoMode};
use docket_runtime::session::TestInvocation;
use docket_sdk::harness::run_with;

const WITH_TESTER: &str = "\
services:
  db:
    image: postgres:16
  tester:
    image: golang:1.22
    labels:
      com.bloomberg.docket: run test
";

const DB_ONLY: &str = "\
services:
  db:
    image: postgres:16
    labels:
      com.bloomberg.docket: mount sources only
";

/// Answers `config` and `port`, fails the subcommand in `failing`, and
/// records the subcommand of every call.
struct ScriptedCompose {
    merged: &'static str,
    failing: Option<&'static str>,
    log: Mutex<Vec<Vec<String>>>,
}

impl ScriptedCompose {
    fn new(merged: &'static str) -> Arc<Self> {
        Arc::new(Self {
            merged,
            failing: None,
            log: Mutex::new(Vec::new()),
        })
    }

    fn failing(merged: &'static str, subcommand: &'static str) -> Arc<Self> {
        Arc::new(Self {
            merged,
            failing: Some(subcommand),
            log: Mutex::new(Vec::new()),
        })
    }

    fn subcommands(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|args| args[0].clone())
            .collect()
    }

    fn call(&self, subcommand: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .find(|args| args[0] == subcommand)
            .cloned()
            .unwrap_or_else(|| panic!("no {subcommand} call"))
    }
}

impl CommandRunner for ScriptedCompose {
    fn run(
        &self,
        spec: &CommandSpec,
        _io: IoMode,
        _cancel: &CancellationToken,
    ) -> Result<CommandOutput> {
        let mut rest = Vec::new();
        let mut args = spec.args.iter();
        while let Some(arg) = args.next() {
            if arg == "--file" && rest.is_empty() {
                let _ = args.next();
            } else {
                rest.push(arg.clone());
            }
        }
        self.log.lock().unwrap().push(rest.clone());

        let sub = rest[0].as_str();
        if self.failing == Some(sub) {
            return Ok(CommandOutput::failed(4, "scripted failure"));
        }
        Ok(match sub {
            "config" => CommandOutput::ok(self.merged),
            "port" => CommandOutput::ok("0.0.0.0:32768\n"),
            _ => CommandOutput::ok(""),
        })
    }
}

struct ModuleProbe(PathBuf);

impl DependencyProbe for ModuleProbe {
    fn package(&self, _cancel: &CancellationToken) -> Result<PackageInfo> {
        Ok(PackageInfo {
            dir: self.0.clone(),
            import_path: "example.com/svc".into(),
            module: Some(ModuleInfo {
                path: "example.com/svc".into(),
                dir: self.0.clone(),
            }),
        })
    }

    fn cache_roots(&self, _cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        Ok(vec![PathBuf::from("/home/dev/go")])
    }
}

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("docket.yaml"), "services: {}\n").expect("write");
    std::fs::write(dir.path().join("docket.ci.yml"), "services: {}\n").expect("write");
    dir
}

fn ci_config() -> DocketConfig {
    DocketConfig::default().with_mode("ci")
}

fn leftover_mounts(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .expect("read dir")
        .filter(|e| {
            e.as_ref()
                .expect("entry")
                .file_name()
                .to_string_lossy()
                .starts_with("docket-source-mounts.")
        })
        .count()
}

fn run_scripted(
    config: DocketConfig,
    compose: &Arc<ScriptedCompose>,
    dir: &Path,
    test: impl FnOnce(docket_sdk::DocketContext<'_>),
) -> Result<()> {
    let runner: Arc<dyn CommandRunner> = compose.clone();
    run_with(
        config,
        runner,
        &ModuleProbe(dir.to_path_buf()),
        dir,
        &TestInvocation::new("TestOrders"),
        test,
    )
}

#[test]
fn delegates_to_test_service_and_leaves_app_running() {
    let dir = project();
    let compose = ScriptedCompose::new(WITH_TESTER);

    let mut ran_locally = false;
    run_scripted(ci_config(), &compose, dir.path(), |_| ran_locally = true).expect("run");

    assert!(!ran_locally);
    assert_eq!(compose.subcommands(), ["config", "up", "exec"]);
    assert_eq!(
        compose.call("exec"),
        ["exec", "-T", "tester", "go", "test", "-run", "^TestOrders$", "-count=1"]
    );
    assert_eq!(leftover_mounts(dir.path()), 0);
}

#[test]
fn pull_and_down_toggles() {
    let dir = project();
    let compose = ScriptedCompose::new(WITH_TESTER);
    let mut config = ci_config();
    config.pull = true;
    config.pull_opts = vec!["--ignore-pull-failures".into()];
    config.down = true;

    run_scripted(config, &compose, dir.path(), |_| {}).expect("run");

    assert_eq!(compose.subcommands(), ["config", "pull", "up", "exec", "down"]);
    assert_eq!(compose.call("pull"), ["pull", "--ignore-pull-failures"]);
}

#[test]
fn local_body_sees_mode_and_ports() {
    let dir = project();
    let compose = ScriptedCompose::new(DB_ONLY);

    let mut observed = None;
    run_scripted(ci_config(), &compose, dir.path(), |ctx| {
        observed = Some((
            ctx.mode().map(str::to_owned),
            ctx.published_port("db", 5432).expect("port"),
        ));
    })
    .expect("run");

    assert_eq!(observed, Some((Some("ci".to_owned()), 32768)));
    assert_eq!(compose.call("port"), ["port", "db", "5432"]);
}

#[test]
fn failed_up_skips_the_test_but_cleans_up() {
    let dir = project();
    let compose = ScriptedCompose::failing(WITH_TESTER, "up");

    let mut ran = false;
    let err = run_scripted(ci_config(), &compose, dir.path(), |_| ran = true).unwrap_err();

    assert!(matches!(err, DocketError::CommandFailed { code: Some(4), .. }), "got: {err}");
    assert!(!ran);
    assert_eq!(compose.subcommands(), ["config", "up"]);
    assert_eq!(leftover_mounts(dir.path()), 0);
}

#[test]
fn remote_failure_still_brings_app_down() {
    let dir = project();
    let compose = ScriptedCompose::failing(WITH_TESTER, "exec");
    let mut config = ci_config();
    config.down = true;

    let err = run_scripted(config, &compose, dir.path(), |_| {}).unwrap_err();

    assert!(
        matches!(err, DocketError::RemoteTestExecFailed { code: Some(4), .. }),
        "got: {err}"
    );
    assert_eq!(err.exit_code(), 4);
    assert_eq!(compose.subcommands(), ["config", "up", "exec", "down"]);
}

#[test]
fn panicking_body_still_brings_app_down() {
    let dir = project();
    let compose = ScriptedCompose::new(DB_ONLY);
    let mut config = ci_config();
    config.down = true;

    let unwound = panic::catch_unwind(AssertUnwindSafe(|| {
        run_scripted(config, &compose, dir.path(), |_| panic!("assertion failed in body"))
    }));

    assert!(unwound.is_err());
    assert_eq!(compose.subcommands(), ["config", "up", "down"]);
    assert_eq!(leftover_mounts(dir.path()), 0);
}

#[test]
fn missing_files_report_no_matching_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let compose = ScriptedCompose::new(WITH_TESTER);

    let err = run_scripted(ci_config(), &compose, dir.path(), |_| {}).unwrap_err();
    assert!(matches!(err, DocketError::NoMatchingFiles { .. }), "got: {err}");
    assert!(compose.subcommands().is_empty());
}
