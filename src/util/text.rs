//! Label-safe identifier helpers.

/// Replace hyphens with underscores so host and rack ids can be used as labels.
#[must_use]
pub fn replace_hyphens_with_underscores(value: &str) -> String {
    value.replace('-', "_")
}
