//! System-wide constants, environment variable names, and container paths.

/// Default file-name prefix for environment definition files.
pub const DEFAULT_PREFIX: &str = "docket";

/// Label key used to assign a role to a compose service.
pub const DEFAULT_ROLE_LABEL: &str = "com.bloomberg.docket";

/// Label value marking the service that runs the tests (and receives mounts).
pub const ROLE_RUN_TEST: &str = "run test";

/// Label value marking a service that only receives source mounts.
pub const ROLE_MOUNT_SOURCES: &str = "mount sources only";

/// Default compose command.
pub const DEFAULT_COMPOSE_PROGRAM: &str = "docker-compose";

/// Compose file format version written into the source mounts fragment.
pub const MOUNTS_FRAGMENT_VERSION: &str = "3.2";

/// File-name prefix of the temporary source mounts fragment.
pub const MOUNTS_FILE_PREFIX: &str = "docket-source-mounts.";

/// File-name suffix of the temporary source mounts fragment.
pub const MOUNTS_FILE_SUFFIX: &str = ".yaml";

/// Container path where the dependency cache root is mounted (legacy layout).
pub const CONTAINER_CACHE_ROOT: &str = "/go";

/// Container path where the module cache is mounted (module layout).
pub const CONTAINER_MODULE_CACHE: &str = "/go/pkg/mod";

/// Container path where the module root is mounted (module layout).
pub const CONTAINER_MODULE_DIR: &str = "/go-module-dir";

/// Path segment under a cache root that holds legacy package sources.
pub const LEGACY_SOURCE_DIR: &str = "src";

/// Relative path of the module cache under a cache root.
pub const MODULE_CACHE_SUBDIR: [&str; 2] = ["pkg", "mod"];

/// Environment variable selecting the active mode.
pub const ENV_MODE: &str = "DOCKET_MODE";
/// Environment variable overriding the file-name prefix.
pub const ENV_PREFIX: &str = "DOCKET_PREFIX";
/// Environment variable enabling `pull` before `up`.
pub const ENV_PULL: &str = "DOCKET_PULL";
/// Environment variable holding extra `pull` arguments (whitespace separated).
pub const ENV_PULL_OPTS: &str = "DOCKET_PULL_OPTS";
/// Environment variable enabling `down` after the run.
pub const ENV_DOWN: &str = "DOCKET_DOWN";
/// Environment variable keeping the source mounts fragment on disk.
pub const ENV_KEEP_MOUNTS_FILE: &str = "DOCKET_KEEP_MOUNTS_FILE";
/// Environment variable overriding the compose command (e.g. `docker compose`).
pub const ENV_COMPOSE: &str = "DOCKET_COMPOSE";

/// Exit code used for internal resolution and classification failures.
pub const INTERNAL_ERROR_EXIT_CODE: i32 = 1;
