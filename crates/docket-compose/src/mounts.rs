//! Source mounts: bind the caller's sources and dependency cache into every
//! service whose role asks for them.
//!
//! The plan depends only on the [`DependencyLocation`], so it is computed
//! once and applied verbatim to each service that needs it. The result is
//! expressed as a compose fragment that the session writes to a temporary
//! file and passes to the compose tool as one more `--file`.

use docket_common::constants::{
    CONTAINER_CACHE_ROOT, CONTAINER_MODULE_CACHE, CONTAINER_MODULE_DIR, LEGACY_SOURCE_DIR,
    MOUNTS_FRAGMENT_VERSION,
};
use docket_common::error::Result;
use docket_common::types::{BindMount, DependencyLayout, DependencyLocation, MountPlan};

use crate::model::{ComposeConfig, ServiceSpec, VolumeMount, VolumeSpec};
use crate::roles;

/// Computes the mount plan for a dependency location.
pub fn plan_for(location: &DependencyLocation) -> MountPlan {
    match &location.layout {
        DependencyLayout::Module {
            module_root,
            path_in_module,
            module_cache,
        } => MountPlan {
            volumes: vec![
                BindMount {
                    source: module_cache.clone(),
                    target: CONTAINER_MODULE_CACHE.into(),
                },
                BindMount {
                    source: module_root.clone(),
                    target: CONTAINER_MODULE_DIR.into(),
                },
            ],
            working_dir: join_container_path(CONTAINER_MODULE_DIR, path_in_module),
        },
        DependencyLayout::Legacy {
            cache_root,
            package_name,
        } => MountPlan {
            volumes: vec![BindMount {
                source: cache_root.clone(),
                target: CONTAINER_CACHE_ROOT.into(),
            }],
            working_dir: format!("{CONTAINER_CACHE_ROOT}/{LEGACY_SOURCE_DIR}/{package_name}"),
        },
    }
}

fn join_container_path(base: &str, relative: &str) -> String {
    let relative = relative.trim_matches('/');
    if relative.is_empty() || relative == "." {
        base.to_owned()
    } else {
        format!("{base}/{relative}")
    }
}

/// Services that receive the source mounts, and the plan applied to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMounts {
    /// Mounted services, in sorted order.
    pub services: Vec<String>,
    /// Plan shared by all of them.
    pub plan: MountPlan,
}

impl SourceMounts {
    /// Renders the mounts as a compose fragment.
    pub fn to_fragment(&self) -> ComposeConfig {
        let volumes: Vec<VolumeSpec> = self
            .plan
            .volumes
            .iter()
            .map(|bind| {
                VolumeSpec::Long(VolumeMount {
                    kind: "bind".into(),
                    source: bind.source.to_string_lossy().into_owned(),
                    target: bind.target.clone(),
                })
            })
            .collect();

        let service = ServiceSpec {
            volumes,
            working_dir: Some(self.plan.working_dir.clone()),
            ..ServiceSpec::default()
        };

        ComposeConfig {
            version: Some(MOUNTS_FRAGMENT_VERSION.into()),
            services: self
                .services
                .iter()
                .map(|name| (name.clone(), service.clone()))
                .collect(),
            networks: std::collections::BTreeMap::new(),
        }
    }
}

/// Builds the source mounts for `config`.
///
/// Returns `Ok(None)` when no service has a role that needs mounts.
///
/// # Errors
///
/// Returns an error if a service carries an unrecognized role label.
pub fn build(
    config: &ComposeConfig,
    location: &DependencyLocation,
    label_key: &str,
) -> Result<Option<SourceMounts>> {
    let services: Vec<String> = roles::classify_all(config, label_key)?
        .into_iter()
        .filter(|(_, role)| role.needs_mounts())
        .map(|(name, _)| name.to_owned())
        .collect();

    if services.is_empty() {
        tracing::debug!("no services need source mounts");
        return Ok(None);
    }

    let plan = plan_for(location);
    tracing::info!(
        layout = location.layout.name(),
        ?services,
        working_dir = %plan.working_dir,
        "source mounts planned"
    );
    Ok(Some(SourceMounts { services, plan }))
}
