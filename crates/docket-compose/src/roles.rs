//! Service classification through the role label.

use docket_common::constants::{ROLE_MOUNT_SOURCES, ROLE_RUN_TEST};
use docket_common::error::{DocketError, Result};
use docket_common::types::ServiceRole;

use crate::model::{ComposeConfig, ServiceSpec};

/// Classifies one service by the value of its `label_key` label.
///
/// # Errors
///
/// Returns [`DocketError::UnrecognizedRoleLabel`] for any value other than
/// empty, `"run test"`, or `"mount sources only"`.
pub fn classify(name: &str, service: &ServiceSpec, label_key: &str) -> Result<ServiceRole> {
    match service.labels.get(label_key).map_or("", String::as_str) {
        "" => Ok(ServiceRole::None),
        ROLE_RUN_TEST => Ok(ServiceRole::RunTest),
        ROLE_MOUNT_SOURCES => Ok(ServiceRole::MountSources),
        other => Err(DocketError::UnrecognizedRoleLabel {
            service: name.to_owned(),
            key: label_key.to_owned(),
            value: other.to_owned(),
        }),
    }
}

/// Classifies every service, in sorted name order.
///
/// # Errors
///
/// Returns the first classification error encountered.
pub fn classify_all<'a>(
    config: &'a ComposeConfig,
    label_key: &str,
) -> Result<Vec<(&'a str, ServiceRole)>> {
    config
        .services
        .iter()
        .map(|(name, svc)| classify(name, svc, label_key).map(|role| (name.as_str(), role)))
        .collect()
}

/// Finds the single service labeled to run tests.
///
/// Returns `Ok(None)` when no service carries the label, meaning the tests
/// run in-process.
///
/// # Errors
///
/// Returns [`DocketError::MultipleTestServices`] naming the first two
/// labeled services in sorted order, or a classification error.
pub fn find_test_service(config: &ComposeConfig, label_key: &str) -> Result<Option<String>> {
    let mut found: Option<&str> = None;
    for (name, role) in classify_all(config, label_key)? {
        if !role.runs_tests() {
            continue;
        }
        if let Some(first) = found {
            return Err(DocketError::MultipleTestServices {
                first: first.to_owned(),
                second: name.to_owned(),
            });
        }
        found = Some(name);
    }

    tracing::debug!(test_service = ?found, "test service lookup");
    Ok(found.map(str::to_owned))
}
