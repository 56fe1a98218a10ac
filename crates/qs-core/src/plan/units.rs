//! Byte-size and time-unit normalization shared by the plan parsers.

use regex::Regex;
use std::sync::OnceLock;

static BYTES: OnceLock<Regex> = OnceLock::new();

fn bytes_pattern() -> &'static Regex {
    BYTES.get_or_init(|| Regex::new(r"(?i)(nan|[0-9.]+)\s*([kmgt]?b)").expect("valid regex"))
}

/// Convert a byte-size string like "45B", "352.59kB" or "1.23MB" to an
/// integer byte count (power-of-1024 multiplier, truncated). Units are
/// case-insensitive and a space before the unit is tolerated. An empty,
/// "null", "NaN" or otherwise unparseable string yields zero.
pub fn bytes_to_i64(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return 0;
    }

    let Some(caps) = bytes_pattern().captures(trimmed) else {
        return 0;
    };

    let value: f64 = caps[1].parse().unwrap_or(0.0);
    if !value.is_finite() {
        return 0;
    }

    let multiplier = match caps[2].to_ascii_uppercase().as_str() {
        "B" => 1_i64,
        "KB" => 1 << 10,
        "MB" => 1 << 20,
        "GB" => 1 << 30,
        "TB" => 1_i64 << 40,
        _ => return 0,
    };

    (value * multiplier as f64) as i64
}

/// Convert a time value with its unit ("ms", "s" or "m") to
/// milliseconds.
pub fn time_to_ms(value: &str, unit: &str) -> f64 {
    let v: f64 = value.parse().unwrap_or(0.0);
    match unit {
        "s" => v * 1000.0,
        "m" => v * 60_000.0,
        _ => v,
    }
}
