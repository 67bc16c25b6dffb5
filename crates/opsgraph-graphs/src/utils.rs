//! Axis label helpers shared by the renderer and report sections.

use crate::table::Value;
use opsgraph_common::format_number;

/// Pixels per inch when sizing figures in inches.
pub const PIXELS_PER_INCH: u32 = 100;

/// Figure size in pixels for a size given in inches.
pub const fn inches(width: u32, height: u32) -> (u32, u32) {
    (width * PIXELS_PER_INCH, height * PIXELS_PER_INCH)
}

/// Label for a categorical axis drawn on a continuous `-0.5..n-0.5` range.
///
/// Only positions that land on a category center get a label.
pub fn category_label(labels: &[String], x: f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 1e-6 || nearest < 0.0 {
        return String::new();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let index = nearest as usize;
    labels.get(index).cloned().unwrap_or_default()
}

/// Like [`category_label`] for axes drawn bottom-up, first label on top.
pub fn reversed_category_label(labels: &[String], y: f64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let top = labels.len() as f64 - 1.0;
    category_label(labels, top - y)
}

/// Compact numeric tick label.
pub fn tick_label(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 10.0 || value.fract() == 0.0 {
        format_number(value.round())
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// `MM-DD` for date-like values, plain text otherwise.
pub fn short_date_label(value: &Value) -> String {
    match value {
        Value::Date(_) | Value::Number(_) => value
            .as_date()
            .map_or_else(|| value.to_string(), |d| d.format("%m-%d").to_string()),
        _ => value.to_string(),
    }
}

/// `YYYY-MM-DD` for date-like values, plain text otherwise.
pub fn long_date_label(value: &Value) -> String {
    value
        .as_date()
        .map_or_else(|| value.to_string(), |d| d.format("%Y-%m-%d").to_string())
}

/// Short date labels for a pivot index.
pub fn index_labels(index: &[Value]) -> Vec<String> {
    index.iter().map(short_date_label).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn labels() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn test_category_label_only_on_centers() {
        assert_eq!(category_label(&labels(), 1.0), "b");
        assert_eq!(category_label(&labels(), 0.5), "");
        assert_eq!(category_label(&labels(), -1.0), "");
        assert_eq!(category_label(&labels(), 7.0), "");
        assert_eq!(reversed_category_label(&labels(), 2.0), "a");
    }

    #[test]
    fn test_tick_label() {
        assert_eq!(tick_label(2_500_000.0), "2.5M");
        assert_eq!(tick_label(1200.0), "1200");
        assert_eq!(tick_label(0.25), "0.25");
        assert_eq!(tick_label(0.5), "0.5");
        assert_eq!(tick_label(3.0), "3");
    }

    #[test]
    fn test_date_labels() {
        let day = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap());
        assert_eq!(short_date_label(&day), "03-07");
        assert_eq!(short_date_label(&Value::Number(20_240_307.0)), "03-07");
        assert_eq!(short_date_label(&Value::from("W12")), "W12");
        assert_eq!(long_date_label(&day), "2024-03-07");
        assert_eq!(inches(14, 10), (1400, 1000));
    }
}
