//! Remote path construction and upload filename sanitization.

/// Join a request path onto the configured base directory with exactly one
/// separator between them.
pub fn join_remote(base: &str, relative: &str) -> String {
    let base = base.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    format!("{base}/{relative}")
}

/// Target of a listing: like [`join_remote`] with trailing separators removed.
/// An empty result is the filesystem root.
pub fn list_target(base: &str, relative: &str) -> String {
    let joined = join_remote(base, relative);
    let trimmed = joined.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Reduce a client-supplied filename to its final segment.
///
/// Both `/` and `\` count as separators. Returns `None` if nothing usable is
/// left.
pub fn sanitize_filename(name: &str) -> Option<&str> {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or("");
    match base {
        "" | "." | ".." => None,
        other => Some(other),
    }
}
