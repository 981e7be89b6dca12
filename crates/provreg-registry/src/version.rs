//! Version token ordering.
//!
//! Version tokens are stored as opaque strings. For listing they are ordered
//! with semantic-version precedence where both sides parse, and tokens that
//! are not valid semver sort after every semver token, lexically.

use std::cmp::Ordering;

/// Parse a version token, tolerating a leading `v`.
pub fn parse_version(token: &str) -> Option<semver::Version> {
    let trimmed = token.strip_prefix('v').unwrap_or(token);
    semver::Version::parse(trimmed).ok()
}

/// Compare two version tokens.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Sort version tokens in listing order.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by(|a, b| compare(a, b));
}
