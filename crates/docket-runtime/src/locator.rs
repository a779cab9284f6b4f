//! Dependency location: where the package under test and its dependency
//! caches live on the host.
//!
//! The raw facts come from a [`DependencyProbe`] (by default the Go
//! toolchain: `go list -json` and `go env GOPATH`); [`locate`] turns them
//! into a [`DependencyLocation`] for one of the two layouts.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use docket_common::constants::{LEGACY_SOURCE_DIR, MODULE_CACHE_SUBDIR};
use docket_common::error::{DocketError, Result};
use docket_common::types::{DependencyLayout, DependencyLocation};
use serde::Deserialize;

use crate::cancel::CancellationToken;
use crate::process::{CommandRunner, CommandSpec, IoMode};

/// The module that contains the package under test.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModuleInfo {
    /// Module path.
    #[serde(default)]
    pub path: String,
    /// Directory holding the module definition.
    pub dir: PathBuf,
}

/// The package under test.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PackageInfo {
    /// Package directory.
    pub dir: PathBuf,
    /// Import path.
    #[serde(default)]
    pub import_path: String,
    /// Enclosing module; `None` in legacy path-based mode.
    #[serde(default)]
    pub module: Option<ModuleInfo>,
}

/// Source of the facts needed to locate dependencies.
pub trait DependencyProbe: Send + Sync {
    /// Describes the package in the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the toolchain cannot describe the package.
    fn package(&self, cancel: &CancellationToken) -> Result<PackageInfo>;

    /// Lists the configured dependency cache roots, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the toolchain cannot report its roots.
    fn cache_roots(&self, cancel: &CancellationToken) -> Result<Vec<PathBuf>>;
}

/// Probes the Go toolchain.
pub struct GoToolchain {
    runner: Arc<dyn CommandRunner>,
    dir: PathBuf,
}

impl GoToolchain {
    /// Creates a probe that runs `go` in `dir` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>, dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            dir: dir.into(),
        }
    }

    fn output(&self, args: &[&str], cancel: &CancellationToken) -> Result<String> {
        let spec = CommandSpec::new("go")
            .args(args.iter().copied())
            .current_dir(&self.dir);
        let out = self.runner.run(&spec, IoMode::Captured, cancel)?;
        if !out.success() {
            return Err(DocketError::Probe {
                command: spec.argv(),
                message: format!("exit code {:?}: {}", out.code, out.stderr.trim()),
            });
        }
        Ok(out.stdout)
    }
}

impl DependencyProbe for GoToolchain {
    fn package(&self, cancel: &CancellationToken) -> Result<PackageInfo> {
        let stdout = self.output(&["list", "-json"], cancel)?;
        Ok(serde_json::from_str(&stdout)?)
    }

    fn cache_roots(&self, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        let stdout = self.output(&["env", "GOPATH"], cancel)?;
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        Ok(std::env::split_paths(trimmed).collect())
    }
}

/// Renders a relative path with `/` separators.
fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Finds the logical package name of `dir`: its path below `<root>/src/`
/// for the first root in `roots` that contains it.
///
/// # Errors
///
/// Returns [`DocketError::NoMatchingRoot`] if no root contains `dir` under
/// its source directory.
pub fn legacy_package_name(dir: &Path, roots: &[PathBuf]) -> Result<String> {
    roots
        .iter()
        .find_map(|root| {
            let below_src = dir.strip_prefix(root.join(LEGACY_SOURCE_DIR)).ok()?;
            let name = slash_path(below_src);
            (!name.is_empty()).then_some(name)
        })
        .ok_or_else(|| DocketError::NoMatchingRoot {
            dir: dir.to_path_buf(),
            roots: roots.to_vec(),
        })
}

/// Decides the dependency layout for `package` given the configured roots.
///
/// Module mode mounts the module cache of the first root and tolerates
/// additional roots. Legacy mode mounts the whole root and therefore
/// requires exactly one.
///
/// # Errors
///
/// Returns [`DocketError::NoMatchingRoot`] when no roots are configured or
/// the package is outside them, and [`DocketError::MultipleCacheRoots`] for
/// several roots in legacy mode.
pub fn locate(package: &PackageInfo, roots: &[PathBuf]) -> Result<DependencyLocation> {
    let Some(first_root) = roots.first() else {
        return Err(DocketError::NoMatchingRoot {
            dir: package.dir.clone(),
            roots: Vec::new(),
        });
    };

    let layout = if let Some(module) = &package.module {
        if roots.len() > 1 {
            tracing::debug!(?roots, "using the first root as the module cache");
        }
        let in_module =
            package
                .dir
                .strip_prefix(&module.dir)
                .map_err(|_| DocketError::NoMatchingRoot {
                    dir: package.dir.clone(),
                    roots: vec![module.dir.clone()],
                })?;
        DependencyLayout::Module {
            module_root: module.dir.clone(),
            path_in_module: slash_path(in_module),
            module_cache: MODULE_CACHE_SUBDIR
                .iter()
                .fold(first_root.clone(), |path, part| path.join(part)),
        }
    } else {
        if roots.len() > 1 {
            return Err(DocketError::MultipleCacheRoots {
                roots: roots.to_vec(),
            });
        }
        DependencyLayout::Legacy {
            cache_root: first_root.clone(),
            package_name: legacy_package_name(&package.dir, roots)?,
        }
    };

    tracing::info!(
        dir = %package.dir.display(),
        layout = layout.name(),
        "dependency layout resolved"
    );
    Ok(DependencyLocation {
        working_dir: package.dir.clone(),
        layout,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::process::CommandOutput;

    fn legacy_package(dir: &str) -> PackageInfo {
        PackageInfo {
            dir: PathBuf::from(dir),
            import_path: String::new(),
            module: None,
        }
    }

    fn module_package(dir: &str, module_dir: &str) -> PackageInfo {
        PackageInfo {
            dir: PathBuf::from(dir),
            import_path: String::new(),
            module: Some(ModuleInfo {
                path: "example.com/app".into(),
                dir: PathBuf::from(module_dir),
            }),
        }
    }

    #[test]
    fn legacy_name_strips_src() {
        let name = legacy_package_name(
            Path::new("/home/dev/go/src/example.com/app/pkg"),
            &[PathBuf::from("/home/dev/go")],
        )
        .expect("should resolve");
        assert_eq!(name, "example.com/app/pkg");
    }

    #[test]
    fn legacy_name_uses_first_matching_root() {
        let roots = [PathBuf::from("/elsewhere"), PathBuf::from("/home/dev/go")];
        let name = legacy_package_name(Path::new("/home/dev/go/src/a/b"), &roots)
            .expect("should resolve");
        assert_eq!(name, "a/b");
    }

    #[test]
    fn legacy_name_requires_src_segment() {
        let err = legacy_package_name(
            Path::new("/home/dev/go/pkg/example.com/app"),
            &[PathBuf::from("/home/dev/go")],
        )
        .unwrap_err();
        assert!(matches!(err, DocketError::NoMatchingRoot { .. }), "got: {err}");
    }

    #[test]
    fn legacy_name_rejects_similar_prefix() {
        let err = legacy_package_name(
            Path::new("/home/dev/go/srcfoo/app"),
            &[PathBuf::from("/home/dev/go")],
        )
        .unwrap_err();
        assert!(matches!(err, DocketError::NoMatchingRoot { .. }), "got: {err}");
    }

    #[test]
    fn locate_legacy_layout() {
        let loc = locate(
            &legacy_package("/home/dev/go/src/example.com/app"),
            &[PathBuf::from("/home/dev/go")],
        )
        .expect("should locate");
        assert_eq!(
            loc.layout,
            DependencyLayout::Legacy {
                cache_root: PathBuf::from("/home/dev/go"),
                package_name: "example.com/app".into(),
            }
        );
        assert_eq!(loc.working_dir, PathBuf::from("/home/dev/go/src/example.com/app"));
    }

    #[test]
    fn locate_legacy_rejects_multiple_roots() {
        let err = locate(
            &legacy_package("/a/src/x"),
            &[PathBuf::from("/a"), PathBuf::from("/b")],
        )
        .unwrap_err();
        assert!(matches!(err, DocketError::MultipleCacheRoots { .. }), "got: {err}");
    }

    #[test]
    fn locate_module_layout() {
        let loc = locate(
            &module_package("/work/app/internal/db", "/work/app"),
            &[PathBuf::from("/home/dev/go"), PathBuf::from("/opt/go")],
        )
        .expect("should locate");
        assert_eq!(
            loc.layout,
            DependencyLayout::Module {
                module_root: PathBuf::from("/work/app"),
                path_in_module: "internal/db".into(),
                module_cache: PathBuf::from("/home/dev/go/pkg/mod"),
            }
        );
    }

    #[test]
    fn locate_module_root_package() {
        let loc = locate(&module_package("/work/app", "/work/app"), &[PathBuf::from("/go")])
            .expect("should locate");
        assert!(matches!(
            loc.layout,
            DependencyLayout::Module { ref path_in_module, .. } if path_in_module.is_empty()
        ));
    }

    #[test]
    fn locate_without_roots_fails() {
        let err = locate(&module_package("/work/app", "/work/app"), &[]).unwrap_err();
        assert!(matches!(err, DocketError::NoMatchingRoot { .. }), "got: {err}");
    }

    struct ScriptedRunner {
        outputs: Mutex<Vec<CommandOutput>>,
        seen: Mutex<Vec<CommandSpec>>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            spec: &CommandSpec,
            _io: IoMode,
            _cancel: &CancellationToken,
        ) -> Result<CommandOutput> {
            self.seen.lock().expect("lock").push(spec.clone());
            Ok(self.outputs.lock().expect("lock").remove(0))
        }
    }

    fn toolchain(outputs: Vec<CommandOutput>) -> (GoToolchain, Arc<ScriptedRunner>) {
        let runner = Arc::new(ScriptedRunner {
            outputs: Mutex::new(outputs),
            seen: Mutex::new(Vec::new()),
        });
        (GoToolchain::new(runner.clone(), "/work/app"), runner)
    }

    #[test]
    fn go_list_json_is_parsed() {
        let json = r#"{
            "Dir": "/work/app/internal/db",
            "ImportPath": "example.com/app/internal/db",
            "Name": "db",
            "Module": {"Path": "example.com/app", "Dir": "/work/app", "GoVersion": "1.22"}
        }"#;
        let (probe, runner) = toolchain(vec![CommandOutput::ok(json)]);
        let pkg = probe.package(&CancellationToken::new()).expect("package");

        assert_eq!(pkg.dir, PathBuf::from("/work/app/internal/db"));
        assert_eq!(pkg.module.expect("module").dir, PathBuf::from("/work/app"));
        let seen = runner.seen.lock().expect("lock");
        assert_eq!(seen[0].argv(), vec!["go", "list", "-json"]);
        assert_eq!(seen[0].current_dir, Some(PathBuf::from("/work/app")));
    }

    #[test]
    fn go_list_without_module_is_legacy() {
        let json = r#"{"Dir": "/go/src/a", "ImportPath": "a"}"#;
        let (probe, _) = toolchain(vec![CommandOutput::ok(json)]);
        assert!(probe.package(&CancellationToken::new()).expect("package").module.is_none());
    }

    #[test]
    fn gopath_is_split_into_roots() {
        let joined = std::env::join_paths(["/a", "/b"]).expect("join");
        let stdout = format!("{}\n", joined.to_string_lossy());
        let (probe, _) = toolchain(vec![CommandOutput::ok(stdout)]);
        let roots = probe.cache_roots(&CancellationToken::new()).expect("roots");
        assert_eq!(roots, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }

    #[test]
    fn failing_toolchain_is_a_probe_error() {
        let (probe, _) = toolchain(vec![CommandOutput::failed(1, "go: no Go files\n")]);
        let err = probe.package(&CancellationToken::new()).unwrap_err();
        match err {
            DocketError::Probe { command, message } => {
                assert_eq!(command, vec!["go", "list", "-json"]);
                assert!(message.contains("no Go files"), "got: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
