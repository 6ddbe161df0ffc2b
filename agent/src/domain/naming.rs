//! Identity sanitizer: maps opaque control-plane identifiers to names that are
//! legal for containers, images and compose projects.
//!
//! Pure functions only: no I/O.

use std::sync::LazyLock;

use regex::Regex;

/// Prefix shared by every resource the agent creates.
pub const RESOURCE_PREFIX: &str = "hostpilot-";

/// Upper bound on the sanitized identifier length.
pub const MAX_SANITIZED_LEN: usize = 50;

/// Returned when nothing legal survives sanitization.
pub const FALLBACK_NAME: &str = "app";

static ILLEGAL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"[^A-Za-z0-9._-]").unwrap()
});

/// Normalize an identifier to `[A-Za-z0-9._-]{1,50}`.
///
/// Drops every other character, strips leading/trailing dots, truncates to
/// [`MAX_SANITIZED_LEN`] and falls back to [`FALLBACK_NAME`] when empty.
/// Total, deterministic and idempotent.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let kept = ILLEGAL_CHARS.replace_all(raw, "");
    // Output is pure ASCII here, so byte truncation is char-safe.
    let mut out = kept.trim_matches('.');
    if out.len() > MAX_SANITIZED_LEN {
        out = out[..MAX_SANITIZED_LEN].trim_end_matches('.');
    }
    if out.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        out.to_string()
    }
}

/// Container name of the Managed Instance for `app_id`.
#[must_use]
pub fn resource_name(app_id: &str) -> String {
    format!("{RESOURCE_PREFIX}{}", sanitize(app_id))
}

/// Image tag built for `app_id`: the resource name, lowercased.
///
/// Image repository names must be lowercase.
#[must_use]
pub fn image_tag(app_id: &str) -> String {
    resource_name(app_id).to_ascii_lowercase()
}

/// Compose project name for `app_id`, restricted to `[a-z0-9_-]`.
#[must_use]
pub fn project_name(app_id: &str) -> String {
    image_tag(app_id).replace('.', "-")
}
