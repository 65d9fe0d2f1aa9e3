//! Renders a [`ChartSpec`] to a PNG on local disk.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::pipeline::graphic::{ChartKind, ChartSpec};

const CHART_WIDTH: u32 = 900;
const CHART_HEIGHT: u32 = 600;

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("Chart spec is not renderable")]
    InvalidSpec,
    #[error("Chart rendering failed: {0}")]
    Render(String),
}

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Draws the spec into a PNG at `path`. The spec is re-validated here so the
/// renderer holds its own invariants even for hand-built specs.
pub fn render_chart(spec: &ChartSpec, path: &Path) -> Result<(), ChartError> {
    if !spec.is_renderable() {
        return Err(ChartError::InvalidSpec);
    }

    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    match spec.kind {
        ChartKind::Bar => draw_bar(spec, &root)?,
        ChartKind::Line => draw_line(spec, &root)?,
        ChartKind::Pie => draw_pie(spec, &root)?,
    }

    root.present().map_err(render_err)
}

fn series_color(index: usize) -> RGBColor {
    let (r, g, b) = Palette99::COLORS[index % Palette99::COLORS.len()];
    RGBColor(r, g, b)
}

/// Y range covering every value plus the zero baseline, with 5% headroom.
fn value_bounds(spec: &ChartSpec) -> (f64, f64) {
    let mut lo = 0.0f64;
    let mut hi = 0.0f64;
    for series in &spec.series {
        for v in &series.values {
            lo = lo.min(*v);
            hi = hi.max(*v);
        }
    }
    if hi == lo {
        hi = lo + 1.0;
    }
    (lo, hi + (hi - lo) * 0.05)
}

fn label_at(spec: &ChartSpec, x: f64) -> String {
    spec.labels
        .get(x.floor().max(0.0) as usize)
        .cloned()
        .unwrap_or_default()
}

fn draw_bar(spec: &ChartSpec, root: &DrawingArea<BitMapBackend, Shift>) -> Result<(), ChartError> {
    let n = spec.labels.len();
    let (y_min, y_max) = value_bounds(spec);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..n as f64, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| label_at(spec, *x))
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(render_err)?;

    // Groups of bars per category, 10% gutter on each side
    let bar_width = 0.8 / spec.series.len() as f64;
    for (si, series) in spec.series.iter().enumerate() {
        let color = series_color(si);
        chart
            .draw_series(series.values.iter().enumerate().map(|(i, v)| {
                let x0 = i as f64 + 0.1 + si as f64 * bar_width;
                Rectangle::new([(x0, 0.0), (x0 + bar_width, *v)], color.filled())
            }))
            .map_err(render_err)?
            .label(series.name.clone())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
            });
    }

    if spec.series.len() > 1 {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()
            .map_err(render_err)?;
    }
    Ok(())
}

fn draw_line(spec: &ChartSpec, root: &DrawingArea<BitMapBackend, Shift>) -> Result<(), ChartError> {
    let n = spec.labels.len();
    let (y_min, y_max) = value_bounds(spec);
    let x_max = (n.saturating_sub(1)).max(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| label_at(spec, x.round()))
        .x_desc(spec.x_label.as_str())
        .y_desc(spec.y_label.as_str())
        .draw()
        .map_err(render_err)?;

    for (si, series) in spec.series.iter().enumerate() {
        let color = series_color(si);
        chart
            .draw_series(LineSeries::new(
                series
                    .values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (i as f64, *v)),
                color.stroke_width(2),
            ))
            .map_err(render_err)?
            .label(series.name.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 10, y)], color.stroke_width(2))
            });
    }

    if spec.series.len() > 1 {
        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()
            .map_err(render_err)?;
    }
    Ok(())
}

/// Pies only use the first series; validation guarantees non-negative slices
/// with a positive total.
fn draw_pie(spec: &ChartSpec, root: &DrawingArea<BitMapBackend, Shift>) -> Result<(), ChartError> {
    let area = root
        .titled(&spec.title, ("sans-serif", 28))
        .map_err(render_err)?;

    let sizes = spec.series[0].values.clone();
    let colors: Vec<RGBColor> = (0..sizes.len()).map(series_color).collect();

    let center = ((CHART_WIDTH / 2) as i32, (CHART_HEIGHT / 2) as i32);
    let radius = (CHART_HEIGHT.min(CHART_WIDTH) as f64) * 0.35;

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &spec.labels);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 14).into_font().color(&BLACK));
    area.draw(&pie).map_err(render_err)
}
