//! Domain primitive types used across the docket workspace.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Role of a compose service, derived from its role label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceRole {
    /// No role label (or an empty one).
    None,
    /// Receives source mounts and is the single test-execution target.
    RunTest,
    /// Receives source mounts but does not run tests.
    MountSources,
}

impl ServiceRole {
    /// Whether services with this role get the source mounts.
    pub const fn needs_mounts(self) -> bool {
        matches!(self, Self::RunTest | Self::MountSources)
    }

    /// Whether services with this role run the tests.
    pub const fn runs_tests(self) -> bool {
        matches!(self, Self::RunTest)
    }
}

impl fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::RunTest => write!(f, "{}", crate::constants::ROLE_RUN_TEST),
            Self::MountSources => write!(f, "{}", crate::constants::ROLE_MOUNT_SOURCES),
        }
    }
}

/// How the caller's dependencies are laid out on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyLayout {
    /// Module-aware resolution: sources live in a module root anywhere on
    /// disk, dependencies in a shared module cache.
    Module {
        /// Directory containing the module definition.
        module_root: PathBuf,
        /// Package directory relative to `module_root` (`/`-separated, may be empty).
        path_in_module: String,
        /// Host directory of the module cache.
        module_cache: PathBuf,
    },
    /// Legacy path-based resolution: sources live at `<root>/src/<package>`.
    Legacy {
        /// The single dependency cache root.
        cache_root: PathBuf,
        /// Logical package name (`/`-separated path below `src/`).
        package_name: String,
    },
}

impl DependencyLayout {
    /// Short name of the layout for log output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Module { .. } => "module",
            Self::Legacy { .. } => "legacy",
        }
    }
}

/// Where the caller's sources and dependency caches are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLocation {
    /// Directory of the package under test.
    pub working_dir: PathBuf,
    /// Resolution layout with its layout-specific paths.
    pub layout: DependencyLayout,
}

/// A single bind mount from the host into a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    /// Host path.
    pub source: PathBuf,
    /// Container path.
    pub target: String,
}

/// Volumes and working directory applied to every service that needs sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountPlan {
    /// Bind mounts, in order.
    pub volumes: Vec<BindMount>,
    /// Working directory inside the container.
    pub working_dir: String,
}
