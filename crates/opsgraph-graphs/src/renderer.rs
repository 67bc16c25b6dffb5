//! Bitmap rendering of [`Figure`]s with plotters.
//!
//! Every call owns its canvas: the backend is created, drawn, presented and
//! dropped inside [`render_figure`], so a failed chart leaves nothing open.

use crate::figure::{BarMode, ChartPanel, Figure, HeatmapPanel, Marker, Panel, Series};
use crate::style::{heat_color, ChartStyle};
use crate::utils::{category_label, reversed_category_label, tick_label};
use opsgraph_common::Result;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::{CoordTranslate, Shift};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const TITLE_BAND: i32 = 48;
const BAR_WIDTH: f64 = 0.8;
const LEGEND_ROW: i32 = 20;

/// Renders a figure to an image file; the format follows the extension.
pub fn render_figure(figure: &Figure, style: &ChartStyle, path: &Path) -> Result<()> {
    figure.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let size = figure.size.unwrap_or(style.size);
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&style.background)?;

    let (header, body) = root.split_vertically(TITLE_BAND);
    header.draw_text(&figure.title, &style.title_font(), (16, 12))?;

    let cells = body.split_evenly((figure.rows, figure.cols));
    for (area, panel) in cells.iter().zip(&figure.panels) {
        match panel {
            Panel::Chart(chart) if chart.scale.log_base().is_some() => draw_log_panel(area, chart, style)?,
            Panel::Chart(chart) => draw_chart_panel(area, chart, style)?,
            Panel::Heatmap(heatmap) => draw_heatmap_panel(area, heatmap, style)?,
            Panel::Empty => {}
        }
    }

    root.present()?;
    info!(path = %path.display(), panels = figure.panels.len(), "Rendered chart");
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn x_range(n: usize) -> Range<f64> {
    -0.5..(n as f64 - 0.5)
}

#[allow(clippy::cast_precision_loss)]
fn points(values: &[f64]) -> Vec<(f64, f64)> {
    values.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect()
}

fn series_color(style: &ChartStyle, series: &Series, position: usize) -> RGBColor {
    style.color(series.color.unwrap_or(position))
}

fn draw_chart_panel(area: &Area<'_>, panel: &ChartPanel, style: &ChartStyle) -> Result<()> {
    if !panel.has_data() {
        return Ok(());
    }
    let n = panel.x_labels.len();
    let (lo, hi) = panel.primary_range();
    let dual = !panel.secondary.is_empty();

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(12)
        .x_label_area_size(if panel.rotate_x_labels { 110 } else { 40 })
        .y_label_area_size(72);
    if dual {
        builder.right_y_label_area_size(72);
    }
    if let Some(title) = &panel.title {
        builder.caption(title, style.panel_title_font());
    }
    let mut chart = builder.build_cartesian_2d(x_range(n), lo..hi)?;

    let labels = &panel.x_labels;
    let x_fmt = |x: &f64| category_label(labels, *x);
    let y_fmt = |y: &f64| tick_label(*y);
    let x_font = if panel.rotate_x_labels {
        style.tick_font().transform(FontTransform::Rotate90)
    } else {
        style.tick_font()
    };

    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(TRANSPARENT)
        .bold_line_style(style.grid.stroke_width(1))
        .x_labels(n.min(16))
        .y_labels(8)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(x_font)
        .y_label_style(style.tick_font())
        .axis_desc_style(style.tick_font())
        .axis_style(style.text.stroke_width(1));
    if !style.grid_x {
        mesh.disable_x_mesh();
    }
    if !style.grid_y {
        mesh.disable_y_mesh();
    }
    if let Some(desc) = &panel.y_desc {
        mesh.y_desc(desc);
    }
    mesh.draw()?;

    draw_bars(&mut chart, panel, style)?;
    for (i, series) in panel.lines.iter().enumerate() {
        let color = series_color(style, series, i + panel.bars.len());
        draw_line(&mut chart, series, color, style)?;
        if let Some(format) = panel.value_labels {
            chart.draw_series(series.values.iter().enumerate().map(|(x, &v)| {
                #[allow(clippy::cast_precision_loss)]
                let pos = (x as f64, v);
                Text::new(format.format(v), pos, style.annotation_font())
            }))?;
        }
    }

    if panel.legend {
        draw_series_labels(&mut chart, SeriesLabelPosition::UpperLeft, style)?;
    }

    if dual {
        let (slo, shi) = panel.secondary_bounds();
        let mut chart = chart.set_secondary_coord(x_range(n), slo..shi);
        let mut axes = chart.configure_secondary_axes();
        axes.y_label_formatter(&y_fmt)
            .label_style(style.tick_font())
            .axis_desc_style(style.tick_font());
        if let Some(desc) = &panel.secondary_desc {
            axes.y_desc(desc);
        }
        axes.draw()?;

        let offset = panel.bars.len() + panel.lines.len();
        let mut entries = Vec::with_capacity(panel.secondary.len());
        for (i, series) in panel.secondary.iter().enumerate() {
            let color = series_color(style, series, offset + i);
            chart.draw_secondary_series(LineSeries::new(
                points(&series.values),
                color.stroke_width(style.line_width),
            ))?;
            chart.draw_secondary_series(
                points(&series.values)
                    .into_iter()
                    .map(|p| Circle::new(p, 3, color.filled())),
            )?;
            entries.push((series.label.as_str(), color));
        }

        if panel.legend {
            draw_secondary_legend(&chart.plotting_area().strip_coord_spec(), &entries, style)?;
        }
    }

    debug!(
        title = panel.title.as_deref().unwrap_or(""),
        bars = panel.bars.len(),
        lines = panel.lines.len(),
        "Drew chart panel"
    );
    Ok(())
}

fn draw_series_labels<'a, CT: CoordTranslate>(
    chart: &mut ChartContext<'a, BitMapBackend<'a>, CT>,
    position: SeriesLabelPosition,
    style: &ChartStyle,
) -> Result<()> {
    chart
        .configure_series_labels()
        .position(position)
        .background_style(WHITE.mix(0.8))
        .border_style(style.grid)
        .label_font(style.legend_font())
        .draw()?;
    Ok(())
}

/// Legend box for secondary-axis lines in the upper right of the plot area.
fn draw_secondary_legend(area: &Area<'_>, entries: &[(&str, RGBColor)], style: &ChartStyle) -> Result<()> {
    if entries.is_empty() {
        return Ok(());
    }
    let font = style.legend_font();
    let mut text_width = 0u32;
    for (label, _) in entries {
        text_width = text_width.max(area.estimate_text_size(label, &font)?.0);
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    let (width, text_width, count) = (
        area.dim_in_pixel().0 as i32,
        text_width as i32,
        entries.len() as i32,
    );
    let row = LEGEND_ROW;
    let right = width - 10;
    let left = right - text_width - 40;
    let (top, bottom) = (10, 10 + row * count + 8);

    area.draw(&Rectangle::new([(left, top), (right, bottom)], WHITE.mix(0.8).filled()))?;
    area.draw(&Rectangle::new([(left, top), (right, bottom)], style.grid.stroke_width(1)))?;
    let anchored = font.pos(Pos::new(HPos::Left, VPos::Center));
    for (i, (label, color)) in entries.iter().enumerate() {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let y = top + 4 + row * i as i32 + row / 2;
        area.draw(&PathElement::new(
            vec![(left + 8, y), (left + 24, y)],
            color.stroke_width(2),
        ))?;
        area.draw(&Text::new(*label, (left + 30, y), anchored.clone()))?;
    }
    Ok(())
}

fn draw_bars(chart: &mut Chart<'_, '_>, panel: &ChartPanel, style: &ChartStyle) -> Result<()> {
    let n = panel.x_labels.len();
    let k = panel.bars.len();
    let mut positive = vec![0.0; n];
    let mut negative = vec![0.0; n];

    for (s, series) in panel.bars.iter().enumerate() {
        let color = series_color(style, series, s);
        let mut rects = Vec::with_capacity(n);
        for (i, &v) in series.values.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let center = i as f64;
            let rect = match panel.bar_mode {
                BarMode::Stacked => {
                    let base = if v >= 0.0 { &mut positive[i] } else { &mut negative[i] };
                    let from = *base;
                    *base += v;
                    [(center - BAR_WIDTH / 2.0, from), (center + BAR_WIDTH / 2.0, *base)]
                }
                BarMode::Grouped => {
                    #[allow(clippy::cast_precision_loss)]
                    let width = BAR_WIDTH / k as f64;
                    #[allow(clippy::cast_precision_loss)]
                    let left = center - BAR_WIDTH / 2.0 + width * s as f64;
                    [(left, 0.0), (left + width, v)]
                }
            };
            rects.push(Rectangle::new(rect, color.filled()));
        }
        chart
            .draw_series(rects)?
            .label(series.label.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }
    Ok(())
}

fn draw_line(chart: &mut Chart<'_, '_>, series: &Series, color: RGBColor, style: &ChartStyle) -> Result<()> {
    let data = points(&series.values);
    chart
        .draw_series(LineSeries::new(data.clone(), color.stroke_width(style.line_width)))?
        .label(series.label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
    match series.marker {
        Marker::None => {}
        Marker::Circle => {
            chart.draw_series(data.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
        }
        Marker::Cross => {
            chart.draw_series(data.into_iter().map(|p| Cross::new(p, 4, color.stroke_width(2))))?;
        }
    }
    Ok(())
}

fn draw_log_panel(area: &Area<'_>, panel: &ChartPanel, style: &ChartStyle) -> Result<()> {
    if !panel.has_data() {
        return Ok(());
    }
    let n = panel.x_labels.len();
    let (lo, hi) = panel.log_bounds();

    let mut builder = ChartBuilder::on(area);
    builder.margin(12).x_label_area_size(40).y_label_area_size(72);
    if let Some(title) = &panel.title {
        builder.caption(title, style.panel_title_font());
    }
    let base = panel.scale.log_base().unwrap_or(10);
    let mut chart = builder.build_cartesian_2d(x_range(n), (lo..hi).log_scale().base(f64::from(base)))?;

    let labels = &panel.x_labels;
    let x_fmt = |x: &f64| category_label(labels, *x);
    let y_fmt = |y: &f64| tick_label(*y);
    let mut mesh = chart.configure_mesh();
    mesh.light_line_style(TRANSPARENT)
        .bold_line_style(style.grid.stroke_width(1))
        .x_labels(n.min(16))
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(style.tick_font())
        .y_label_style(style.tick_font())
        .axis_desc_style(style.tick_font());
    if !style.grid_x {
        mesh.disable_x_mesh();
    }
    if !style.grid_y {
        mesh.disable_y_mesh();
    }
    if let Some(desc) = &panel.y_desc {
        mesh.y_desc(desc);
    }
    mesh.draw()?;

    for (i, series) in panel.lines.iter().enumerate() {
        let color = series_color(style, series, i);
        let data: Vec<(f64, f64)> = points(&series.values)
            .into_iter()
            .map(|(x, y)| (x, y.max(1.0)))
            .collect();
        chart
            .draw_series(LineSeries::new(data.clone(), color.stroke_width(style.line_width)))?
            .label(series.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color.stroke_width(2)));
        if series.marker != Marker::None {
            chart.draw_series(data.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
        }
    }

    if panel.legend {
        draw_series_labels(&mut chart, SeriesLabelPosition::UpperRight, style)?;
    }
    Ok(())
}

fn draw_heatmap_panel(area: &Area<'_>, panel: &HeatmapPanel, style: &ChartStyle) -> Result<()> {
    let rows = panel.row_labels.len();
    let cols = panel.col_labels.len();
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, style.panel_title_font())
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(96)
        .build_cartesian_2d(x_range(cols), x_range(rows))?;

    let x_fmt = |x: &f64| category_label(&panel.col_labels, *x);
    let y_fmt = |y: &f64| reversed_category_label(&panel.row_labels, *y);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols)
        .y_labels(rows)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_label_style(style.tick_font())
        .y_label_style(style.tick_font())
        .draw()?;

    let centered = style
        .tick_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Center));
    for (r, row) in panel.cells.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let y = (rows - 1 - r) as f64;
        for (c, &value) in row.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let x = c as f64;
            let fill = heat_color(panel.normalized(value));
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                fill.filled(),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                panel.format.format(value),
                (x, y),
                centered.clone(),
            )))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{ChartPanel, ValueFormat};
    use opsgraph_config::StyleConfig;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("d{i}")).collect()
    }

    #[test]
    fn test_axis_helpers() {
        assert_eq!(x_range(3), -0.5..2.5);
        assert_eq!(points(&[4.0, 5.0]), vec![(0.0, 4.0), (1.0, 5.0)]);
    }

    #[test]
    fn test_invalid_figure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kpi").join("broken.jpg");
        let figure = Figure::single("broken", ChartPanel::new(labels(3)).line(Series::new("x", vec![1.0])));
        let err = render_figure(&figure, &ChartStyle::from_config(&StyleConfig::default()), &path).unwrap_err();
        assert!(err.is_schema_gap());
        assert!(!path.exists());
    }

    fn dual_axis_panel() -> ChartPanel {
        ChartPanel::new(labels(4))
            .bar(Series::new("paid", vec![10.0, 20.0, 15.0, 5.0]))
            .bar(Series::new("free", vec![3.0, 4.0, 2.0, 1.0]))
            .secondary_line(Series::new("pr", vec![0.1, 0.2, 0.15, 0.3]).color(2))
            .secondary_line(Series::new("avgdiamond", vec![0.3, 0.1, 0.2, 0.25]).color(3))
            .value_labels(ValueFormat::Decimals(2))
            .legend(true)
    }

    #[test]
    fn test_dual_axis_panel_renders_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activities").join("overview.png");
        let figure = Figure::single("overview", dual_axis_panel());

        render_figure(&figure, &ChartStyle::from_config(&StyleConfig::default()), &path).unwrap();
        assert!(path.is_file());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_vertical_grid_renders_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kpi").join("grid.png");
        let mut config = StyleConfig::default();
        config.grid.show_x = true;
        let style = ChartStyle::from_config(&config);
        assert!(style.grid_x);

        let log = ChartPanel::new(labels(3))
            .line(Series::new("pu", vec![1.0, 40.0, 900.0]))
            .log_scale(2)
            .legend(true);
        let figure = Figure::stacked("grid", vec![dual_axis_panel().into(), log.into()]);
        render_figure(&figure, &style, &path).unwrap();
        assert!(path.is_file());
    }
}
