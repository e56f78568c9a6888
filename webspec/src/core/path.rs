//! Helpers for workspace-relative plan paths.
//!
//! Plan paths are `/`-separated and relative to the working directory. They are
//! never normalized on disk; a path that is absolute or climbs out with `..` is
//! rejected instead.

/// Join path fragments with `/`, skipping empty and `.` fragments.
pub fn join_rel(parts: &[&str]) -> String {
    let joined: Vec<&str> = parts
        .iter()
        .flat_map(|part| part.split('/'))
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();
    if joined.is_empty() {
        return ".".to_string();
    }
    joined.join("/")
}

/// True if `path` stays inside the working directory.
pub fn is_contained(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return false;
    }
    // Drive prefixes such as `C:` are absolute on Windows.
    if path.as_bytes().get(1) == Some(&b':') {
        return false;
    }
    !path.split(['/', '\\']).any(|segment| segment == "..")
}

/// Strip a leading `./` so glob matching sees the canonical relative form.
pub fn normalize(path: &str) -> &str {
    let mut trimmed = path;
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed
}
