//! Runtime validation of a loaded configuration.

use crate::schema::{CategoriesConfig, Config, StyleConfig};
use opsgraph_common::{OpsGraphError, Result, VipTier, ZoneAge};
use std::collections::HashSet;

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates a configuration, reporting the first offending field.
    pub fn validate(config: &Config) -> Result<()> {
        if config.paths.input_file.as_os_str().is_empty() {
            return Err(OpsGraphError::validation_field(
                "input file path must not be empty",
                "paths.input_file",
            ));
        }
        if config.paths.output_dir.as_os_str().is_empty() {
            return Err(OpsGraphError::validation_field(
                "output directory must not be empty",
                "paths.output_dir",
            ));
        }
        if config.logging.level.trim().is_empty() {
            return Err(OpsGraphError::validation_field(
                "log level must not be empty",
                "logging.level",
            ));
        }

        Self::validate_style(&config.style)?;
        Self::validate_categories(&config.categories)
    }

    fn validate_style(style: &StyleConfig) -> Result<()> {
        if style.palette.is_empty() {
            return Err(OpsGraphError::validation_field(
                "palette needs at least one color",
                "style.palette",
            ));
        }
        for (i, color) in style.palette.iter().enumerate() {
            check_color(color, &format!("style.palette[{i}]"))?;
        }
        check_color(&style.background, "style.background")?;
        check_color(&style.text_color, "style.text_color")?;
        check_color(&style.grid.color, "style.grid.color")?;

        if style.width == 0 || style.height == 0 {
            return Err(OpsGraphError::validation_field(
                format!("figure size {}x{} must be positive", style.width, style.height),
                "style.width",
            ));
        }
        for (value, field) in [
            (style.title_font_size, "style.title_font_size"),
            (style.panel_title_font_size, "style.panel_title_font_size"),
            (style.tick_label_size, "style.tick_label_size"),
            (style.legend_font_size, "style.legend_font_size"),
            (style.line_width, "style.line_width"),
        ] {
            if value == 0 {
                return Err(OpsGraphError::validation_field("must be positive", field));
            }
        }
        Ok(())
    }

    fn validate_categories(categories: &CategoriesConfig) -> Result<()> {
        check_labels(
            &categories.vip_sheet_labels,
            VipTier::ALL.len(),
            "categories.vip_sheet_labels",
        )?;
        check_labels(
            &categories.vip_display_labels,
            VipTier::ALL.len(),
            "categories.vip_display_labels",
        )?;
        check_labels(
            &categories.zone_sheet_labels,
            ZoneAge::ALL.len(),
            "categories.zone_sheet_labels",
        )?;
        check_labels(
            &categories.zone_display_labels,
            ZoneAge::ALL.len(),
            "categories.zone_display_labels",
        )
    }
}

/// Parses a `#rrggbb` color into its components.
pub fn parse_hex_color(input: &str) -> Option<(u8, u8, u8)> {
    let hex = input.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn check_color(color: &str, field: &str) -> Result<()> {
    parse_hex_color(color).map(|_| ()).ok_or_else(|| {
        OpsGraphError::validation_field(format!("'{color}' is not a #rrggbb color"), field)
    })
}

fn check_labels(labels: &[String], expected: usize, field: &str) -> Result<()> {
    if labels.len() != expected {
        return Err(OpsGraphError::validation_field(
            format!("expected {expected} labels, found {}", labels.len()),
            field,
        ));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(OpsGraphError::validation_field("labels must not be blank", field));
        }
        if !seen.insert(label.as_str()) {
            return Err(OpsGraphError::validation_field(
                format!("duplicate label '{label}'"),
                field,
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#006767"), Some((0x00, 0x67, 0x67)));
        assert_eq!(parse_hex_color(" #FFffFF "), Some((255, 255, 255)));
        assert_eq!(parse_hex_color("006767"), None);
        assert_eq!(parse_hex_color("#00676"), None);
        assert_eq!(parse_hex_color("#zz6767"), None);
    }

    #[test]
    fn test_rejects_bad_palette_entry() {
        let mut config = Config::default();
        config.style.palette[3] = "red".to_string();
        let err = ConfigValidator::validate(&config).unwrap_err();
        match err {
            OpsGraphError::Validation { field, .. } => {
                assert_eq!(field.as_deref(), Some("style.palette[3]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_wrong_label_count() {
        let mut config = Config::default();
        config.categories.vip_display_labels.pop();
        assert!(ConfigValidator::validate(&config).is_err());

        let mut config = Config::default();
        config.categories.zone_display_labels[1] = config.categories.zone_display_labels[0].clone();
        assert!(ConfigValidator::validate(&config).is_err());
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let mut config = Config::default();
        config.style.height = 0;
        assert!(ConfigValidator::validate(&config).is_err());
    }

    proptest! {
        #[test]
        fn prop_formatted_colors_parse_back(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let text = format!("#{r:02x}{g:02x}{b:02x}");
            prop_assert_eq!(parse_hex_color(&text), Some((r, g, b)));
        }
    }
}
