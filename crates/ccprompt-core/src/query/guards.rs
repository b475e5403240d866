//! Shared guardrails for target names and file sizes.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

/// Files larger than this are treated as unreadable (generated or binary).
pub const MAX_SOURCE_FILE_BYTES: u64 = 8 * 1024 * 1024;

pub const MAX_TARGET_NAME_LENGTH: usize = 512;

static TARGET_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*(?:\.[\p{L}_$][\p{L}\p{N}_$]*)*$").unwrap()
});

pub fn truncate_target(name: &str) -> String {
    let stripped = name.trim();
    if stripped.len() <= MAX_TARGET_NAME_LENGTH {
        return stripped.to_string();
    }
    let mut end = MAX_TARGET_NAME_LENGTH;
    while !stripped.is_char_boundary(end) {
        end -= 1;
    }
    stripped[..end].to_string()
}

/// Dotted identifier such as `Widget`, `pkg.models.Base` or `$helper`.
pub fn is_valid_target_name(name: &str) -> bool {
    TARGET_NAME_RE.is_match(name)
}

/// Split comma-separated entries, trim, drop empties, truncate and
/// de-duplicate while keeping the first occurrence.
pub fn normalize_target_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let names: IndexSet<String> = raw
        .iter()
        .flat_map(|entry| entry.as_ref().split(','))
        .map(truncate_target)
        .filter(|name| !name.is_empty())
        .collect();
    names.into_iter().collect()
}
