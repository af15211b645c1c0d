//! Human-readable size parsing ("10M", "512KB", "100B")

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

static SIZE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*([A-Za-z]*)\s*$").expect("Invalid size regex")
});

fn unit_multiplier(unit: &str) -> Option<u64> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "b" => Some(1),
        "k" | "kb" => Some(1 << 10),
        "m" | "mb" => Some(1 << 20),
        "g" | "gb" => Some(1 << 30),
        "t" | "tb" => Some(1 << 40),
        _ => None,
    }
}

/// Parse a size string into a byte count.
///
/// Units are binary multiples (`1K` = 1024 bytes). A bare number is bytes and
/// fractional values are truncated to whole bytes.
pub fn parse_size(raw: &str) -> Result<u64> {
    let caps = SIZE_REGEX
        .captures(raw)
        .ok_or_else(|| Error::InvalidSize(raw.to_string()))?;

    let number = &caps[1];
    let multiplier =
        unit_multiplier(&caps[2]).ok_or_else(|| Error::InvalidSize(raw.to_string()))?;

    if number.contains('.') {
        let value: f64 = number
            .parse()
            .map_err(|_| Error::InvalidSize(raw.to_string()))?;
        let bytes = value * multiplier as f64;
        if !bytes.is_finite() || bytes >= u64::MAX as f64 {
            return Err(Error::InvalidSize(raw.to_string()));
        }
        return Ok(bytes as u64);
    }

    let value: u64 = number
        .parse()
        .map_err(|_| Error::InvalidSize(raw.to_string()))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| Error::InvalidSize(raw.to_string()))
}
