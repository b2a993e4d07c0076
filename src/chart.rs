use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::advantage::{split, y_bound, AdvantagePoint};
use crate::error::{Error, Result};

pub const DEFAULT_SIZE: (u32, u32) = (1760, 640);

const COLOR_A: RGBColor = RGBColor(0x18, 0x4F, 0xF8);
const COLOR_B: RGBColor = RGBColor(0x00, 0x7F, 0x01);
const ZERO_LINE: RGBColor = RGBColor(0xCB, 0xD5, 0xE1);
const GRID: RGBColor = RGBColor(0xE5, 0xE7, 0xEB);

fn chart_err<E: std::fmt::Debug>(e: E) -> Error {
    Error::Chart(format!("{:?}", e))
}

/// Consecutive present values, as (x, y) runs. Each run becomes one filled
/// shape and one line, so a gap breaks both.
fn runs(series: &[AdvantagePoint], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();

    for (p, v) in series.iter().zip(values) {
        match v {
            Some(y) => current.push((p.x, *y)),
            None => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Horizontal line drawn as short segments.
fn dashed_hline(x0: f64, x1: f64, y: f64, dash: f64, gap: f64) -> Vec<[(f64, f64); 2]> {
    let mut segments = Vec::new();
    let mut x = x0;
    while x < x1 {
        let end = (x + dash).min(x1);
        segments.push([(x, y), (end, y)]);
        x = end + gap;
    }
    segments
}

/// Rasterize the two-colored advantage chart to a PNG at `path`.
///
/// No text is drawn; axis values live in the surrounding email/dashboard.
pub fn render_png(series: &[AdvantagePoint], path: &Path, size: (u32, u32)) -> Result<()> {
    if series.is_empty() {
        return Err(Error::EmptyHistory);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let bound = y_bound(series);
    let x_min = series.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let x_max = series.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
    let (x_min, x_max) = if x_max > x_min {
        (x_min, x_max)
    } else {
        (x_min - 0.5, x_max + 0.5)
    };
    let span = x_max - x_min;

    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(24)
        .build_cartesian_2d(x_min..x_max, -bound..bound)
        .map_err(chart_err)?;

    // dotted y grid at quarter steps
    for step in [-1.0, -0.75, -0.5, -0.25, 0.25, 0.5, 0.75, 1.0] {
        let y = bound * step;
        chart
            .draw_series(
                dashed_hline(x_min, x_max, y, span / 400.0, span / 200.0)
                    .into_iter()
                    .map(|seg| PathElement::new(seg.to_vec(), GRID.stroke_width(1))),
            )
            .map_err(chart_err)?;
    }

    chart
        .draw_series(
            dashed_hline(x_min, x_max, 0.0, span / 120.0, span / 160.0)
                .into_iter()
                .map(|seg| PathElement::new(seg.to_vec(), ZERO_LINE.stroke_width(2))),
        )
        .map_err(chart_err)?;

    let parts = split(series);
    for (values, color) in [(&parts.positive, COLOR_A), (&parts.negative, COLOR_B)] {
        for run in runs(series, values) {
            if run.len() == 1 {
                chart
                    .draw_series(std::iter::once(Circle::new(run[0], 4, color.filled())))
                    .map_err(chart_err)?;
                continue;
            }
            chart
                .draw_series(AreaSeries::new(run.clone(), 0.0, color.mix(0.15).filled()))
                .map_err(chart_err)?;
            chart
                .draw_series(LineSeries::new(run, color.stroke_width(2)))
                .map_err(chart_err)?;
        }
    }

    root.present().map_err(chart_err)?;
    debug!(path = %path.display(), points = series.len(), "chart rendered");
    Ok(())
}
