//! Default values matching the recurring weekly report.

use crate::schema::*;
use opsgraph_common::{LoggingConfig, VipTier, ZoneAge};
use std::path::PathBuf;

/// Series colors, in cycle order.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#006767", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            style: StyleConfig::default(),
            categories: CategoriesConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("data/raw/weekly_report.xlsx"),
            output_dir: PathBuf::from("reports"),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().map(|c| (*c).to_string()).collect(),
            background: "#ffffff".to_string(),
            text_color: "#191919".to_string(),
            font_family: "sans-serif".to_string(),
            title_font_size: 20,
            panel_title_font_size: 14,
            tick_label_size: 12,
            legend_font_size: 11,
            width: 1400,
            height: 700,
            line_width: 3,
            grid: GridConfig::default(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            show_y: true,
            show_x: false,
            color: "#d3d3d3".to_string(),
        }
    }
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            vip_sheet_labels: VipTier::ALL
                .iter()
                .map(|t| t.default_sheet_label().to_string())
                .collect(),
            vip_display_labels: VipTier::ALL
                .iter()
                .map(|t| t.default_display_label().to_string())
                .collect(),
            zone_sheet_labels: ZoneAge::ALL
                .iter()
                .map(|z| z.default_sheet_label().to_string())
                .collect(),
            zone_display_labels: ZoneAge::ALL
                .iter()
                .map(|z| z.default_display_label().to_string())
                .collect(),
            internal_zone_label: "Potential Internal User".to_string(),
        }
    }
}
