//! Shared utility functions: date parsing, safe ratios and label formatting.

use chrono::{Duration, NaiveDate};

/// Token the upstream warehouse export writes for SQL NULL.
pub const NULL_SENTINEL: &str = "\\N";

/// Parses a report date written as `YYYYMMDD`, `YYYY-MM-DD` or `YYYY/MM/DD`.
pub fn parse_report_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    ["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Converts a spreadsheet serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    #[allow(clippy::cast_possible_truncation)]
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Interprets a numeric cell as a date.
///
/// Eight-digit integers are read as `YYYYMMDD`, anything else as a serial.
pub fn date_from_number(value: f64) -> Option<NaiveDate> {
    if value.fract() == 0.0 && (19_000_101.0..=29_991_231.0).contains(&value) {
        #[allow(clippy::cast_possible_truncation)]
        return parse_report_date(&format!("{}", value as i64));
    }
    excel_serial_to_date(value)
}

/// Divides, yielding 0 instead of NaN or infinity.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() || !numerator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Formats a number the way spreadsheet exports print integers: no trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = value as i64;
        whole.to_string()
    } else {
        format!("{value}")
    }
}

/// Builds a lowercase file-name stem from a display name.
pub fn file_stem(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Truncates a label to a maximum number of characters with ellipsis.
pub fn truncate_label(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        input.to_string()
    } else {
        let kept: String = input.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
