//! Configuration schema definitions using serde.

use opsgraph_common::{LoggingConfig, OpsGraphError, VipTier, ZoneAge};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for OpsGraph.
///
/// Built once at start-up and passed by reference to every report section;
/// nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input workbook and output tree locations.
    pub paths: PathsConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Chart styling.
    pub style: StyleConfig,
    /// Categorical orderings and labels.
    pub categories: CategoriesConfig,
}

/// File system locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Spreadsheet workbook holding every report sheet.
    pub input_file: PathBuf,
    /// Root directory for generated images; one subdirectory per section.
    pub output_dir: PathBuf,
}

/// Chart styling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Series color cycle as `#rrggbb` strings.
    pub palette: Vec<String>,
    /// Figure background color.
    pub background: String,
    /// Axis, tick and text color.
    pub text_color: String,
    /// Font family used for every label.
    pub font_family: String,
    /// Figure title size in pixels.
    pub title_font_size: u32,
    /// Panel title size in pixels.
    pub panel_title_font_size: u32,
    /// Axis tick label size in pixels.
    pub tick_label_size: u32,
    /// Legend entry size in pixels.
    pub legend_font_size: u32,
    /// Default figure width in pixels.
    pub width: u32,
    /// Default figure height in pixels.
    pub height: u32,
    /// Stroke width for line series.
    pub line_width: u32,
    /// Grid line configuration.
    pub grid: GridConfig,
}

/// Grid line configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Horizontal grid lines (one per y tick).
    pub show_y: bool,
    /// Vertical grid lines (one per x tick).
    pub show_x: bool,
    /// Grid line color.
    pub color: String,
}

/// Canonical categorical labels.
///
/// Label lists are indexed by the enum ordinal, so their length must equal
/// the enum cardinality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoriesConfig {
    /// VIP tier labels as written in the workbook.
    pub vip_sheet_labels: Vec<String>,
    /// VIP tier labels shown on charts.
    pub vip_display_labels: Vec<String>,
    /// Zone-age labels as written in the workbook.
    pub zone_sheet_labels: Vec<String>,
    /// Zone-age labels shown on charts.
    pub zone_display_labels: Vec<String>,
    /// Zone type marking suspected internal or test accounts.
    pub internal_zone_label: String,
}

impl CategoriesConfig {
    /// Resolves a workbook (or display) label to its VIP tier.
    pub fn vip_tier(&self, label: &str) -> Option<VipTier> {
        let label = label.trim();
        self.vip_sheet_labels
            .iter()
            .position(|l| l == label)
            .or_else(|| self.vip_display_labels.iter().position(|l| l == label))
            .and_then(VipTier::from_ordinal)
    }

    /// Chart label for a VIP tier.
    pub fn vip_label(&self, tier: VipTier) -> &str {
        self.vip_display_labels
            .get(tier.ordinal())
            .map_or_else(|| tier.default_display_label(), String::as_str)
    }

    /// Resolves a workbook (or display) label to its zone age.
    pub fn zone_age(&self, label: &str) -> Option<ZoneAge> {
        let label = label.trim();
        self.zone_sheet_labels
            .iter()
            .position(|l| l == label)
            .or_else(|| self.zone_display_labels.iter().position(|l| l == label))
            .and_then(ZoneAge::from_ordinal)
    }

    /// Chart label for a zone age.
    pub fn zone_label(&self, zone: ZoneAge) -> &str {
        self.zone_display_labels
            .get(zone.ordinal())
            .map_or_else(|| zone.default_display_label(), String::as_str)
    }

    /// Whether a zone type marks internal or test accounts.
    pub fn is_internal_zone(&self, label: &str) -> bool {
        label.trim() == self.internal_zone_label
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), OpsGraphError> {
        crate::validator::ConfigValidator::validate(self)
    }
}
