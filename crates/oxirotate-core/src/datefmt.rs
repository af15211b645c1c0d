//! Archive timestamp patterns
//!
//! Patterns are stored as strftime strings. Moment-style patterns
//! (`YYYY-MM-DD_HH-mm-ss`) are accepted too and translated on load.

use chrono::format::{Item, StrftimeItems};
use chrono::{TimeZone, Utc};

use crate::constants::ARCHIVE_SEPARATOR;
use crate::error::{Error, Result};

/// Moment tokens in match priority order
const MOMENT_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("SSS", "%3f"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("mm", "%M"),
    ("ss", "%S"),
];

/// Translate a moment-style pattern into strftime
pub fn moment_to_strftime(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    'outer: while !rest.is_empty() {
        for (token, replacement) in MOMENT_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }

    out
}

/// Normalize a configured pattern to a validated strftime string
pub fn normalize(pattern: &str) -> Result<String> {
    if pattern.trim().is_empty() {
        return Err(Error::InvalidDateFormat("pattern is empty".to_string()));
    }

    let strftime = if pattern.contains('%') {
        pattern.to_string()
    } else {
        moment_to_strftime(pattern)
    };

    if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
        return Err(Error::InvalidDateFormat(pattern.to_string()));
    }

    // A sample render must be usable as a single path component
    let sample = Utc
        .with_ymd_and_hms(2001, 2, 3, 4, 5, 6)
        .single()
        .map(|t| t.format(&strftime).to_string())
        .unwrap_or_default();
    if sample.is_empty() || sample.contains('/') || sample.contains('\\') {
        return Err(Error::InvalidDateFormat(format!(
            "{} does not render a valid file name component",
            pattern
        )));
    }

    // Archive names split at the last separator; an edge `_` would merge
    // with the separator or the `_NNN` collision suffix
    if sample.contains(ARCHIVE_SEPARATOR) || sample.starts_with('_') || sample.ends_with('_') {
        return Err(Error::InvalidDateFormat(format!(
            "{} renders '{}' or an edge '_' and would break archive names",
            pattern, ARCHIVE_SEPARATOR
        )));
    }

    Ok(strftime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moment_default_pattern() {
        assert_eq!(
            moment_to_strftime("YYYY-MM-DD_HH-mm-ss"),
            "%Y-%m-%d_%H-%M-%S"
        );
    }

    #[test]
    fn test_moment_millis_and_short_year() {
        assert_eq!(moment_to_strftime("YY.MM.DD-ss.SSS"), "%y.%m.%d-%S.%3f");
    }

    #[test]
    fn test_normalize_passes_strftime_through() {
        assert_eq!(normalize("%Y%m%d").unwrap(), "%Y%m%d");
    }

    #[test]
    fn test_normalize_translates_moment() {
        assert_eq!(normalize("YYYY-MM-DD").unwrap(), "%Y-%m-%d");
    }

    #[test]
    fn test_normalize_rejects_separators() {
        assert!(normalize("YYYY/MM/DD").is_err());
        assert!(normalize("%Y/%m").is_err());
    }

    #[test]
    fn test_normalize_rejects_archive_separator() {
        assert!(normalize("YYYY__MM-DD_HH-mm-ss").is_err());
        assert!(normalize("%Y__%m").is_err());
        assert!(normalize("_YYYY-MM-DD").is_err());
        assert!(normalize("YYYY-MM-DD_").is_err());
        assert!(normalize("YYYY_MM_DD").is_ok());
    }

    #[test]
    fn test_normalize_rejects_invalid() {
        assert!(normalize("").is_err());
        assert!(normalize("%Q").is_err());
    }
}
