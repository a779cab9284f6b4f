//! Discovery and ordering of environment definition files.
//!
//! For a prefix `p` and mode `m` the matching files are, in order:
//!
//! 1. `p.yaml` / `p.yml`
//! 2. `p.m.yaml` / `p.m.yml`
//! 3. `p.m.<anything>.yaml` / `p.m.<anything>.yml`
//!
//! Each tier is sorted lexically; tiers are concatenated without re-sorting,
//! so later tiers override earlier ones when handed to the compose tool.

use std::path::Path;

use docket_common::error::{DocketError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Prefix,
    Mode,
    ModeAndMore,
}

fn strip_yaml_extension(name: &str) -> Option<&str> {
    name.strip_suffix(".yaml")
        .or_else(|| name.strip_suffix(".yml"))
}

fn classify(name: &str, prefix: &str, mode: &str) -> Option<Tier> {
    let stem = strip_yaml_extension(name)?;
    if stem == prefix {
        return Some(Tier::Prefix);
    }

    let rest = stem
        .strip_prefix(prefix)?
        .strip_prefix('.')?
        .strip_prefix(mode)?;
    match rest {
        "" => Some(Tier::Mode),
        // at least one character between the dots: `p.m..yaml` is rejected
        more if more.len() > 1 && more.starts_with('.') => Some(Tier::ModeAndMore),
        _ => None,
    }
}

/// Filters `candidates` down to the files belonging to `prefix` and `mode`,
/// ordered by tier and then lexically.
///
/// # Panics
///
/// Panics if `prefix` or `mode` is empty.
pub fn find<S: AsRef<str>>(prefix: &str, mode: &str, candidates: &[S]) -> Vec<String> {
    assert!(
        !prefix.is_empty() && !mode.is_empty(),
        "prefix and mode must not be blank"
    );

    let mut tiered: Vec<(Tier, &str)> = candidates
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|name| classify(name, prefix, mode).map(|tier| (tier, name)))
        .collect();
    tiered.sort_unstable();

    tiered.into_iter().map(|(_, name)| name.to_owned()).collect()
}

/// Lists the file names in `dir` (non-recursively) and returns those that
/// belong to `prefix` and `mode`.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn find_in_dir(dir: &Path, prefix: &str, mode: &str) -> Result<Vec<String>> {
    let io_err = |e| DocketError::Io {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }

    let files = find(prefix, mode, &names);
    tracing::debug!(dir = %dir.display(), prefix, mode, ?files, "resolved environment files");
    Ok(files)
}
