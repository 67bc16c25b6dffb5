//! Resolved drawing style built once from [`StyleConfig`].

use opsgraph_config::{parse_hex_color, StyleConfig};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

/// Palette, colors and fonts ready for plotters.
#[derive(Debug, Clone)]
pub struct ChartStyle {
    /// Series color cycle.
    pub palette: Vec<RGBColor>,
    /// Canvas fill.
    pub background: RGBColor,
    /// Axis and label color.
    pub text: RGBColor,
    /// Grid line color.
    pub grid: RGBColor,
    /// Draw horizontal grid lines.
    pub grid_y: bool,
    /// Draw vertical grid lines.
    pub grid_x: bool,
    /// Font family.
    pub font_family: String,
    /// Figure title size.
    pub title_size: u32,
    /// Panel title size.
    pub panel_title_size: u32,
    /// Tick label size.
    pub tick_size: u32,
    /// Legend entry size.
    pub legend_size: u32,
    /// Default figure size.
    pub size: (u32, u32),
    /// Line stroke width.
    pub line_width: u32,
}

/// Parses `#rrggbb`, falling back to black.
pub fn parse_color(input: &str) -> RGBColor {
    parse_hex_color(input).map_or(BLACK, |(r, g, b)| RGBColor(r, g, b))
}

impl ChartStyle {
    /// Resolves a style configuration.
    pub fn from_config(config: &StyleConfig) -> Self {
        let mut palette: Vec<RGBColor> = config.palette.iter().map(|c| parse_color(c)).collect();
        if palette.is_empty() {
            palette.push(BLACK);
        }
        Self {
            palette,
            background: parse_color(&config.background),
            text: parse_color(&config.text_color),
            grid: parse_color(&config.grid.color),
            grid_y: config.grid.show_y,
            grid_x: config.grid.show_x,
            font_family: config.font_family.clone(),
            title_size: config.title_font_size,
            panel_title_size: config.panel_title_font_size,
            tick_size: config.tick_label_size,
            legend_size: config.legend_font_size,
            size: (config.width, config.height),
            line_width: config.line_width,
        }
    }

    /// Palette entry, cycling.
    pub fn color(&self, index: usize) -> RGBColor {
        self.palette[index % self.palette.len()]
    }

    fn font(&self, size: u32) -> TextStyle<'_> {
        (self.font_family.as_str(), f64::from(size))
            .into_font()
            .color(&self.text)
    }

    /// Figure title font.
    pub fn title_font(&self) -> TextStyle<'_> {
        self.font(self.title_size)
    }

    /// Panel title font.
    pub fn panel_title_font(&self) -> TextStyle<'_> {
        self.font(self.panel_title_size)
    }

    /// Tick label font.
    pub fn tick_font(&self) -> TextStyle<'_> {
        self.font(self.tick_size)
    }

    /// Legend font.
    pub fn legend_font(&self) -> TextStyle<'_> {
        self.font(self.legend_size)
    }

    /// Small centered font for value annotations.
    pub fn annotation_font(&self) -> TextStyle<'_> {
        self.font(self.tick_size.saturating_sub(2).max(8))
            .pos(Pos::new(HPos::Center, VPos::Bottom))
    }
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self::from_config(&StyleConfig::default())
    }
}

/// Diverging blue–yellow–red scale for `t` in `0.0..=1.0`.
pub fn heat_color(t: f64) -> RGBColor {
    const LOW: (f64, f64, f64) = (69.0, 117.0, 180.0);
    const MID: (f64, f64, f64) = (255.0, 255.0, 191.0);
    const HIGH: (f64, f64, f64) = (215.0, 48.0, 39.0);

    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
    let (from, to, k) = if t < 0.5 {
        (LOW, MID, t * 2.0)
    } else {
        (MID, HIGH, (t - 0.5) * 2.0)
    };
    let mix = |a: f64, b: f64| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let channel = (a + (b - a) * k).round().clamp(0.0, 255.0) as u8;
        channel
    };
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}
