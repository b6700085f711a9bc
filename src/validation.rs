//! Validation of user-supplied values.
//!
//! - Version labels (used as a directory name under `releases/`)
//! - Source names and URLs from the configuration file

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Longest accepted version label.
pub const MAX_VERSION_LEN: usize = 64;

/// Default version label: the UTC date as `YYYY-MM-DD`.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use deflect_geoip::validation::default_version_label;
/// let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
/// assert_eq!(default_version_label(now), "2024-03-09");
/// ```
pub fn default_version_label(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// Check that a version label is a single safe path component.
///
/// Allowed characters are ASCII letters, digits, `.`, `_` and `-`. The
/// labels `.` and `..` are rejected.
///
/// # Examples
/// ```
/// use deflect_geoip::validation::validate_version_label;
/// assert!(validate_version_label("2024-05-01").is_ok());
/// assert!(validate_version_label("v1.2.0-rc1").is_ok());
/// assert!(validate_version_label("../etc").is_err());
/// ```
pub fn validate_version_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::Config("Version label must not be empty".to_string()));
    }
    if label.len() > MAX_VERSION_LEN {
        return Err(Error::Config(format!(
            "Version label too long: {} characters (max: {})",
            label.len(),
            MAX_VERSION_LEN
        )));
    }
    if label == "." || label == ".." {
        return Err(Error::Config(format!("Invalid version label '{}'", label)));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::Config(format!(
            "Invalid version label '{}'. Use letters, digits, '.', '_' or '-'",
            label
        )));
    }
    Ok(())
}

/// Source names become manifest identifiers; keep them short and plain.
pub fn validate_source_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 32
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(Error::Config(format!(
            "Invalid source name '{}'. Use lowercase letters, digits, '-' or '_'",
            name
        )));
    }
    Ok(())
}

/// Source URLs must be absolute HTTPS URLs.
pub fn validate_source_url(name: &str, url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Config(format!("Source '{}' has an invalid URL {}: {}", name, url, e)))?;
    if parsed.scheme() != "https" {
        return Err(Error::Config(format!(
            "Source '{}' URL must use HTTPS: {}",
            name, url
        )));
    }
    if parsed.host_str().is_none() {
        return Err(Error::Config(format!("Source '{}' URL has no host: {}", name, url)));
    }
    Ok(())
}
