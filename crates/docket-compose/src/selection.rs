//! Test selection patterns for re-running a test inside a container.
//!
//! The remote runner splits its selection pattern on `/` and matches each
//! element against the corresponding level of a test's hierarchical name.
//! To re-run exactly one test remotely, every level of its name is anchored
//! (`^name$`). If the caller had already narrowed the run below that test,
//! the deeper elements of the caller's pattern are carried over as-is.

/// Builds the selection pattern for `test_name`, preserving any levels of
/// `existing` that go deeper than the test name.
///
/// # Panics
///
/// Panics if `test_name` is empty.
pub fn translate(test_name: &str, existing: &str) -> String {
    assert!(!test_name.is_empty(), "test name must not be empty");

    let mut parts: Vec<String> = test_name.split('/').map(|p| format!("^{p}$")).collect();
    let depth = parts.len();

    if !existing.is_empty() {
        parts.extend(existing.split('/').skip(depth).map(str::to_owned));
    }

    parts.join("/")
}
