//! Path pattern expansion for `realization-*/iter-*` trees
//!
//! Patterns are expanded with glob matching, deduplicated, and classified by
//! the `realization-<digits>` and `iter-<digits>` markers found anywhere in
//! the matched path. Classification is best-effort: paths without a usable
//! marker are dropped, never reported as errors.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use ensemble_core::RealizationId;
use regex::Regex;
use tracing::{debug, warn};

/// Suffix appended to a bare directory
pub const DEFAULT_REALIZATION_SUFFIX: &str = "realization-*/iter-*";

static REALIZATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"realization-(\d+)").expect("realization regex is valid"));

static ITERATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"iter-(\d+)").expect("iteration regex is valid"));

// The last occurrence wins when a marker appears more than once.
fn last_marker(regex: &Regex, path: &Path) -> Option<u32> {
    let text = path.to_string_lossy();
    regex
        .captures_iter(&text)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Realization index embedded in the path
pub fn realization_index(path: &Path) -> Option<RealizationId> {
    last_marker(&REALIZATION_REGEX, path).map(RealizationId)
}

/// Iteration index embedded in the path
pub fn iteration_index(path: &Path) -> Option<u32> {
    last_marker(&ITERATION_REGEX, path)
}

/// Turn a single directory or pattern into the pattern list to expand.
///
/// A string without a realization marker is treated as the case directory
/// and gets [`DEFAULT_REALIZATION_SUFFIX`] appended.
pub fn single_path_patterns(path: &str) -> Vec<String> {
    if path.contains("realization") {
        vec![path.to_string()]
    } else {
        let base = path.trim_end_matches('/');
        vec![format!("{base}/{DEFAULT_REALIZATION_SUFFIX}")]
    }
}

/// Expand every pattern and deduplicate the concrete paths
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> BTreeSet<PathBuf> {
    let mut paths = BTreeSet::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let entries = match glob::glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern, error = %e, "Skipping invalid path pattern");
                continue;
            }
        };
        for entry in entries {
            match entry {
                Ok(path) => {
                    paths.insert(path);
                }
                Err(e) => debug!(error = %e, "Unreadable glob entry"),
            }
        }
    }
    paths
}

/// Group paths by iteration index; paths without one are dropped
pub fn group_by_iteration<'a>(
    paths: impl IntoIterator<Item = &'a PathBuf>,
) -> BTreeMap<u32, Vec<PathBuf>> {
    let mut groups: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
    for path in paths {
        match iteration_index(path) {
            Some(iter) => groups.entry(iter).or_default().push(path.clone()),
            None => debug!(path = %path.display(), "No iteration marker, skipping"),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        let path = Path::new("/data/case/realization-3/iter-2");
        assert_eq!(realization_index(path), Some(RealizationId(3)));
        assert_eq!(iteration_index(path), Some(2));

        let path = Path::new("/data/case/realization-x/pred");
        assert_eq!(realization_index(path), None);
        assert_eq!(iteration_index(path), None);
    }

    #[test]
    fn test_last_marker_wins() {
        let path = Path::new("/realization-1/copy/realization-7/iter-0");
        assert_eq!(realization_index(path), Some(RealizationId(7)));
    }

    #[test]
    fn test_overflowing_marker_is_dropped() {
        let path = Path::new("/case/realization-99999999999/iter-0");
        assert_eq!(realization_index(path), None);
    }

    #[test]
    fn test_single_path_patterns() {
        assert_eq!(
            single_path_patterns("/scratch/case/"),
            vec!["/scratch/case/realization-*/iter-*".to_string()]
        );
        assert_eq!(
            single_path_patterns("/scratch/case/realization-*/iter-0"),
            vec!["/scratch/case/realization-*/iter-0".to_string()]
        );
    }

    #[test]
    fn test_group_by_iteration_is_exact() {
        let paths = vec![
            PathBuf::from("/c/realization-0/iter-1"),
            PathBuf::from("/c/realization-0/iter-10"),
            PathBuf::from("/c/realization-1/iter-1"),
            PathBuf::from("/c/realization-1/pred"),
        ];
        let groups = group_by_iteration(&paths);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&1].len(), 2);
        assert_eq!(groups[&10], vec![PathBuf::from("/c/realization-0/iter-10")]);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let paths = expand_patterns(&["/tmp/[unclosed"]);
        assert!(paths.is_empty());
    }
}
