//! Renderer-independent description of a chart image.
//!
//! Report sections build a [`Figure`] from aggregated tables; the renderer
//! turns it into pixels. Keeping the two apart lets section logic be tested
//! without touching the file system or fonts.

use opsgraph_common::{format_number, OpsGraphError, Result};

/// Point marker drawn on line series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Marker {
    /// Plain line.
    #[default]
    None,
    /// Filled circle at each point.
    Circle,
    /// Cross at each point.
    Cross,
}

/// How value annotations are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueFormat {
    /// Integer-aware number.
    #[default]
    Plain,
    /// Number followed by a `W` (ten-thousands) suffix.
    TenThousands,
    /// Fixed decimals.
    Decimals(usize),
    /// Six significant digits with trailing zeros dropped.
    General,
}

impl ValueFormat {
    /// Renders one value.
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Plain => format_number(value.round()),
            Self::TenThousands => format!("{}W", format_number(value)),
            Self::Decimals(places) => format!("{value:.places$}"),
            Self::General => general(value),
        }
    }
}

const SIGNIFICANT_DIGITS: i32 = 6;

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

fn general(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format_number(value);
    }
    #[allow(clippy::cast_possible_truncation)]
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let text = format!("{value:.5e}");
        return match text.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{exp}", trim_fraction(mantissa)),
            None => text,
        };
    }
    #[allow(clippy::cast_sign_loss)]
    let places = (SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{value:.places$}")).to_string()
}

/// One named data series aligned with the panel's x labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Legend label.
    pub label: String,
    /// One value per x label.
    pub values: Vec<f64>,
    /// Palette index; `None` uses the series position.
    pub color: Option<usize>,
    /// Point marker for line series.
    pub marker: Marker,
}

impl Series {
    /// Creates a series with default color and no marker.
    pub fn new(label: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            label: label.into(),
            values,
            color: None,
            marker: Marker::None,
        }
    }

    /// Pins the series to a palette entry.
    #[must_use]
    pub const fn color(mut self, index: usize) -> Self {
        self.color = Some(index);
        self
    }

    /// Sets the point marker.
    #[must_use]
    pub const fn marker(mut self, marker: Marker) -> Self {
        self.marker = marker;
        self
    }

    fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

/// Layout of several bar series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarMode {
    /// Bars of one x position stacked on top of each other.
    #[default]
    Stacked,
    /// Bars of one x position placed side by side.
    Grouped,
}

/// Primary y axis scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    /// Linear axis starting at zero.
    #[default]
    Linear,
    /// Logarithmic axis with the given base.
    Log(u32),
}

impl Scale {
    /// Base of a logarithmic axis.
    pub const fn log_base(self) -> Option<u32> {
        match self {
            Self::Linear => None,
            Self::Log(base) => Some(base),
        }
    }
}

/// A cartesian panel with bars, lines and an optional secondary axis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartPanel {
    /// Panel title.
    pub title: Option<String>,
    /// Category labels along x.
    pub x_labels: Vec<String>,
    /// Primary axis description.
    pub y_desc: Option<String>,
    /// Bar series on the primary axis.
    pub bars: Vec<Series>,
    /// Bar layout.
    pub bar_mode: BarMode,
    /// Line series on the primary axis.
    pub lines: Vec<Series>,
    /// Line series on the secondary axis.
    pub secondary: Vec<Series>,
    /// Secondary axis description.
    pub secondary_desc: Option<String>,
    /// Fixed secondary range.
    pub secondary_range: Option<(f64, f64)>,
    /// Fixed primary range.
    pub y_range: Option<(f64, f64)>,
    /// Primary axis scale.
    pub scale: Scale,
    /// Annotate line points with their values.
    pub value_labels: Option<ValueFormat>,
    /// Draw a legend.
    pub legend: bool,
    /// Rotate x tick labels by 90 degrees.
    pub rotate_x_labels: bool,
}

impl ChartPanel {
    /// Creates an empty panel over the given x labels.
    pub fn new(x_labels: Vec<String>) -> Self {
        Self {
            x_labels,
            ..Self::default()
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the primary axis description.
    #[must_use]
    pub fn y_desc(mut self, desc: impl Into<String>) -> Self {
        self.y_desc = Some(desc.into());
        self
    }

    /// Adds a bar series.
    #[must_use]
    pub fn bar(mut self, series: Series) -> Self {
        self.bars.push(series);
        self
    }

    /// Adds one bar series per `(label, values)` pair.
    #[must_use]
    pub fn bars_from<I>(mut self, series: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        self.bars
            .extend(series.into_iter().map(|(label, values)| Series::new(label, values)));
        self
    }

    /// Sets the bar layout.
    #[must_use]
    pub const fn bar_mode(mut self, mode: BarMode) -> Self {
        self.bar_mode = mode;
        self
    }

    /// Adds a line series on the primary axis.
    #[must_use]
    pub fn line(mut self, series: Series) -> Self {
        self.lines.push(series);
        self
    }

    /// Adds a line series on the secondary axis.
    #[must_use]
    pub fn secondary_line(mut self, series: Series) -> Self {
        self.secondary.push(series);
        self
    }

    /// Sets the secondary axis description.
    #[must_use]
    pub fn secondary_desc(mut self, desc: impl Into<String>) -> Self {
        self.secondary_desc = Some(desc.into());
        self
    }

    /// Fixes the secondary axis range.
    #[must_use]
    pub const fn secondary_range(mut self, lo: f64, hi: f64) -> Self {
        self.secondary_range = Some((lo, hi));
        self
    }

    /// Uses a logarithmic primary axis.
    #[must_use]
    pub const fn log_scale(mut self, base: u32) -> Self {
        self.scale = Scale::Log(base);
        self
    }

    /// Annotates line points.
    #[must_use]
    pub const fn value_labels(mut self, format: ValueFormat) -> Self {
        self.value_labels = Some(format);
        self
    }

    /// Draws a legend.
    #[must_use]
    pub const fn legend(mut self, show: bool) -> Self {
        self.legend = show;
        self
    }

    /// Rotates x tick labels.
    #[must_use]
    pub const fn rotate_x_labels(mut self) -> Self {
        self.rotate_x_labels = true;
        self
    }

    /// Whether the panel has any series to draw.
    pub fn has_data(&self) -> bool {
        !self.x_labels.is_empty()
            && (!self.bars.is_empty() || !self.lines.is_empty() || !self.secondary.is_empty())
    }

    /// Primary axis range covering bars (stacked or not) and lines.
    pub fn primary_range(&self) -> (f64, f64) {
        if let Some(range) = self.y_range {
            return range;
        }
        let mut hi = self.lines.iter().map(Series::max).fold(f64::NEG_INFINITY, f64::max);
        let mut lo = self.lines.iter().map(Series::min).fold(0.0, f64::min);
        match self.bar_mode {
            BarMode::Stacked if !self.bars.is_empty() => {
                for i in 0..self.x_labels.len() {
                    let (pos, neg) = self.bars.iter().filter_map(|s| s.values.get(i)).fold(
                        (0.0, 0.0),
                        |(p, n), &v| if v >= 0.0 { (p + v, n) } else { (p, n + v) },
                    );
                    hi = hi.max(pos);
                    lo = lo.min(neg);
                }
            }
            _ => {
                hi = self.bars.iter().map(Series::max).fold(hi, f64::max);
                lo = self.bars.iter().map(Series::min).fold(lo, f64::min);
            }
        }
        padded(lo, hi)
    }

    /// Secondary axis range.
    pub fn secondary_bounds(&self) -> (f64, f64) {
        if let Some(range) = self.secondary_range {
            return range;
        }
        let hi = self.secondary.iter().map(Series::max).fold(f64::NEG_INFINITY, f64::max);
        let lo = self.secondary.iter().map(Series::min).fold(0.0, f64::min);
        padded(lo, hi)
    }

    /// Log axis range; values below 1 are drawn at 1.
    pub fn log_bounds(&self) -> (f64, f64) {
        let hi = self
            .lines
            .iter()
            .chain(&self.bars)
            .map(Series::max)
            .fold(1.0, f64::max);
        (1.0, (hi * 2.0).max(10.0))
    }

    fn validate(&self) -> Result<()> {
        let n = self.x_labels.len();
        for series in self.bars.iter().chain(&self.lines).chain(&self.secondary) {
            if series.values.len() != n {
                return Err(OpsGraphError::schema(format!(
                    "series '{}' has {} values for {n} x labels",
                    series.label,
                    series.values.len()
                )));
            }
        }
        Ok(())
    }
}

fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if !hi.is_finite() || hi <= lo {
        return (lo.min(0.0), lo.max(0.0) + 1.0);
    }
    let span = hi - lo;
    let lo = if lo < 0.0 { lo - span * 0.05 } else { lo };
    (lo, hi + span * 0.1)
}

/// An annotated matrix colored by value.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapPanel {
    /// Panel title.
    pub title: String,
    /// Labels down the left edge.
    pub row_labels: Vec<String>,
    /// Labels along the bottom edge.
    pub col_labels: Vec<String>,
    /// `cells[row][col]`.
    pub cells: Vec<Vec<f64>>,
    /// How each cell value is printed.
    pub format: ValueFormat,
}

impl HeatmapPanel {
    /// Smallest and largest cell value.
    pub fn value_range(&self) -> (f64, f64) {
        let values = self.cells.iter().flatten().copied();
        let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if lo.is_finite() {
            (lo, hi)
        } else {
            (0.0, 0.0)
        }
    }

    /// Position of a value within the panel range, in `0.0..=1.0`.
    pub fn normalized(&self, value: f64) -> f64 {
        let (lo, hi) = self.value_range();
        if hi > lo {
            ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
        } else {
            0.5
        }
    }

    fn validate(&self) -> Result<()> {
        let aligned = self.cells.len() == self.row_labels.len()
            && self.cells.iter().all(|r| r.len() == self.col_labels.len());
        if aligned {
            Ok(())
        } else {
            Err(OpsGraphError::schema(format!(
                "heatmap '{}' cells do not match its labels",
                self.title
            )))
        }
    }
}

/// Any drawable panel.
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    /// Bars and lines.
    Chart(ChartPanel),
    /// Annotated matrix.
    Heatmap(HeatmapPanel),
    /// Blank slot in a grid.
    Empty,
}

impl From<ChartPanel> for Panel {
    fn from(panel: ChartPanel) -> Self {
        Self::Chart(panel)
    }
}

impl From<HeatmapPanel> for Panel {
    fn from(panel: HeatmapPanel) -> Self {
        Self::Heatmap(panel)
    }
}

/// A titled grid of panels written to one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    /// Figure title drawn top-left.
    pub title: String,
    /// Pixel size; `None` uses the configured default.
    pub size: Option<(u32, u32)>,
    /// Grid rows.
    pub rows: usize,
    /// Grid columns.
    pub cols: usize,
    /// Panels in row-major order.
    pub panels: Vec<Panel>,
}

impl Figure {
    /// A figure with one panel.
    pub fn single(title: impl Into<String>, panel: impl Into<Panel>) -> Self {
        Self::grid(title, 1, 1, vec![panel.into()])
    }

    /// Panels stacked vertically.
    pub fn stacked(title: impl Into<String>, panels: Vec<Panel>) -> Self {
        let rows = panels.len();
        Self::grid(title, rows, 1, panels)
    }

    /// A `rows × cols` grid.
    pub fn grid(title: impl Into<String>, rows: usize, cols: usize, panels: Vec<Panel>) -> Self {
        Self {
            title: title.into(),
            size: None,
            rows,
            cols,
            panels,
        }
    }

    /// Overrides the pixel size.
    #[must_use]
    pub const fn size(mut self, width: u32, height: u32) -> Self {
        self.size = Some((width, height));
        self
    }

    /// Gives every linear chart in a grid row the union of their ranges.
    #[must_use]
    pub fn share_y_by_row(mut self) -> Self {
        let cols = self.cols.max(1);
        for row in self.panels.chunks_mut(cols) {
            let range = row
                .iter()
                .filter_map(|p| match p {
                    Panel::Chart(c) if c.scale == Scale::Linear && c.has_data() => {
                        Some(c.primary_range())
                    }
                    _ => None,
                })
                .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)));
            if let Some(range) = range {
                for panel in row.iter_mut() {
                    if let Panel::Chart(c) = panel {
                        c.y_range = Some(range);
                    }
                }
            }
        }
        self
    }

    /// Chart panels in row-major order.
    pub fn charts(&self) -> impl Iterator<Item = &ChartPanel> {
        self.panels.iter().filter_map(|p| match p {
            Panel::Chart(c) => Some(c),
            _ => None,
        })
    }

    /// Checks grid capacity, series alignment and that something is drawable.
    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 || self.panels.len() > self.rows * self.cols {
            return Err(OpsGraphError::render(format!(
                "figure '{}' has {} panels for a {}x{} grid",
                self.title,
                self.panels.len(),
                self.rows,
                self.cols
            )));
        }
        let mut drawable = false;
        for panel in &self.panels {
            match panel {
                Panel::Chart(c) => {
                    c.validate()?;
                    drawable |= c.has_data();
                }
                Panel::Heatmap(h) => {
                    h.validate()?;
                    drawable |= !h.cells.is_empty();
                }
                Panel::Empty => {}
            }
        }
        if drawable {
            Ok(())
        } else {
            Err(OpsGraphError::schema(format!("figure '{}' has no data", self.title)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("d{i}")).collect()
    }

    #[test]
    fn test_stacked_range_uses_totals() {
        let panel = ChartPanel::new(labels(2))
            .bar(Series::new("a", vec![10.0, 20.0]))
            .bar(Series::new("b", vec![30.0, 5.0]));
        let (lo, hi) = panel.primary_range();
        assert_eq!(lo, 0.0);
        assert!((hi - 44.0).abs() < 1e-9);

        let grouped = panel.bar_mode(BarMode::Grouped);
        assert!((grouped.primary_range().1 - 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_net_spend_extends_range() {
        let panel = ChartPanel::new(labels(2)).bar(Series::new("net", vec![-10.0, 10.0]));
        let (lo, hi) = panel.primary_range();
        assert!(lo < -10.0);
        assert!(hi > 10.0);
    }

    #[test]
    fn test_all_zero_range_is_not_degenerate() {
        let panel = ChartPanel::new(labels(3)).line(Series::new("pr", vec![0.0; 3]));
        assert_eq!(panel.primary_range(), (0.0, 1.0));
        assert_eq!(panel.log_bounds(), (1.0, 10.0));
    }

    #[test]
    fn test_validate_rejects_misaligned_series() {
        let fig = Figure::single(
            "t",
            ChartPanel::new(labels(3)).line(Series::new("x", vec![1.0])),
        );
        assert!(fig.validate().unwrap_err().is_schema_gap());

        let too_many = Figure::grid("t", 1, 1, vec![Panel::Empty, Panel::Empty]);
        assert!(too_many.validate().is_err());

        let empty = Figure::single("t", ChartPanel::new(Vec::new()));
        assert!(empty.validate().unwrap_err().is_schema_gap());
    }

    #[test]
    fn test_share_y_by_row() {
        let a = ChartPanel::new(labels(1)).line(Series::new("a", vec![5.0]));
        let b = ChartPanel::new(labels(1)).line(Series::new("b", vec![50.0]));
        let c = ChartPanel::new(labels(1)).line(Series::new("c", vec![1.0]));
        let fig = Figure::grid("t", 2, 2, vec![a.into(), b.into(), c.into()]).share_y_by_row();
        let ranges: Vec<_> = fig.charts().map(|c| c.y_range).collect();
        assert_eq!(ranges[0], ranges[1]);
        assert_ne!(ranges[0], ranges[2]);
    }

    #[test]
    fn test_value_formats() {
        assert_eq!(ValueFormat::Plain.format(1234.4), "1234");
        assert_eq!(ValueFormat::TenThousands.format(12.0), "12W");
        assert_eq!(ValueFormat::Decimals(2).format(0.12345), "0.12");
        assert_eq!(ValueFormat::General.format(1234.5678), "1234.57");
        assert_eq!(ValueFormat::General.format(0.125), "0.125");
        assert_eq!(ValueFormat::General.format(200.0), "200");
        assert_eq!(ValueFormat::General.format(0.0), "0");
        assert_eq!(ValueFormat::General.format(12_345_678.0), "1.23457e7");
    }

    #[test]
    fn test_heatmap_normalization() {
        let heat = HeatmapPanel {
            title: "cu".into(),
            row_labels: labels(1),
            col_labels: labels(2),
            cells: vec![vec![2.0, 4.0]],
            format: ValueFormat::Decimals(0),
        };
        assert_eq!(heat.value_range(), (2.0, 4.0));
        assert!((heat.normalized(3.0) - 0.5).abs() < 1e-9);
        assert!(heat.validate().is_ok());
    }
}
