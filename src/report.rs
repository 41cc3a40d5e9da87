//! Static PNG plots written next to each result, and for run summaries.
//!
//! Uses the [`plotters`] bitmap backend so it works without a display.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::analysis::analyzer::TwaSeries;
use crate::analysis::result::{AnalysisResult, FitSummary};
use crate::config::{AppConfig, PlotConfig};
use crate::error::PlotError;

pub const PHASE_PLOT_FILE: &str = "phase_plot.png";
pub const AMPLITUDE_PLOT_FILE: &str = "amplitude_plot.png";

const FONT: &str = "sans-serif";
const FONT_SIZE_TITLE: u32 = 20;
const FONT_SIZE_LABEL: u32 = 16;
const MARKER_SIZE: u32 = 4;

type Result<T> = core::result::Result<T, PlotError>;

// ---------------------------------------------------------------------------
// Axis ranges
// ---------------------------------------------------------------------------

/// Plot range with 15% padding, or a fixed padding for very small ranges.
pub fn calculate_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = (max - min).abs();
    let padding = if range < 1e-6 { 0.5 } else { range * 0.15 };
    (min - padding, max + padding)
}

/// Padded bounds snapped outward to a 1/2/2.5/5/10 × 10ⁿ tick step.
pub fn nice_limits(min_val: f64, max_val: f64, margin: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let span = if max > min { max - min } else { 1.0 };
    let lo = min - span * margin;
    let hi = max + span * margin;

    let raw_step = (hi - lo) / 8.0;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&s| s >= raw_step)
        .unwrap_or(10.0 * magnitude);

    ((lo / step).floor() * step, (hi / step).ceil() * step)
}

fn finite_bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

// ---------------------------------------------------------------------------
// Per-file diagnostic plots
// ---------------------------------------------------------------------------

/// One fitted quantity against √f.
pub struct FitPlot<'a> {
    pub title: String,
    pub y_label: &'a str,
    pub x: &'a [f64],
    pub y: &'a [f64],
    pub used: &'a [usize],
    pub fit: FitSummary,
    pub color: [u8; 3],
}

/// Render phase and amplitude plots into `dest`; returns the written paths.
pub fn render_diagnostics(
    dest: &Path,
    series: &TwaSeries,
    result: &AnalysisResult,
    config: &AppConfig,
) -> Result<Vec<PathBuf>> {
    let phase = FitPlot {
        title: fit_title("Phase", &result.phase),
        y_label: "Phase [rad]",
        x: &series.sqrt_freq,
        y: &series.phase,
        used: &result.used_indices,
        fit: result.phase,
        color: config.plot.color_phase,
    };
    let amplitude = FitPlot {
        title: fit_title("Amplitude", &result.amplitude),
        y_label: config.analysis.amplitude_transform.axis_label(),
        x: &series.sqrt_freq,
        y: &series.amplitude,
        used: &result.used_indices,
        fit: result.amplitude,
        color: config.plot.color_amplitude,
    };

    let phase_path = dest.join(PHASE_PLOT_FILE);
    render_fit_plot(&phase_path, &phase, &config.plot)?;
    let amplitude_path = dest.join(AMPLITUDE_PLOT_FILE);
    render_fit_plot(&amplitude_path, &amplitude, &config.plot)?;
    Ok(vec![phase_path, amplitude_path])
}

fn fit_title(name: &str, fit: &FitSummary) -> String {
    match fit {
        FitSummary::Present {
            diffusivity,
            r_squared,
            ..
        } => format!("{name}: α = {diffusivity:.3e} m²/s (R² = {r_squared:.4})"),
        FitSummary::Absent => format!("{name}: no fit"),
    }
}

pub fn render_fit_plot(path: &Path, plot: &FitPlot<'_>, style: &PlotConfig) -> Result<()> {
    let all: Vec<(f64, f64)> = plot
        .x
        .iter()
        .zip(plot.y)
        .map(|(&x, &y)| (x, y))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    let (x_min, x_max) = finite_bounds(all.iter().map(|p| p.0))
        .ok_or_else(|| PlotError::InvalidData("no finite points to plot".to_string()))?;
    let (y_min, y_max) = finite_bounds(all.iter().map(|p| p.1))
        .ok_or_else(|| PlotError::InvalidData("no finite points to plot".to_string()))?;
    let (x0, x1) = calculate_range(x_min, x_max);
    let (y0, y1) = calculate_range(y_min, y_max);

    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&plot.title, (FONT, FONT_SIZE_TITLE))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("√f [Hz^0.5]")
        .y_desc(plot.y_label)
        .label_style((FONT, FONT_SIZE_LABEL))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    chart
        .draw_series(
            all.iter()
                .map(|&p| Circle::new(p, MARKER_SIZE, RGBColor(200, 200, 200).filled())),
        )
        .map_err(|e| PlotError::Drawing(e.to_string()))?
        .label("All data")
        .legend(|(x, y)| Circle::new((x, y), MARKER_SIZE, RGBColor(200, 200, 200).filled()));

    let color = rgb(plot.color);
    let used: Vec<(f64, f64)> = plot
        .used
        .iter()
        .filter_map(|&i| Some((*plot.x.get(i)?, *plot.y.get(i)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    chart
        .draw_series(used.iter().map(|&p| Circle::new(p, MARKER_SIZE, color.filled())))
        .map_err(|e| PlotError::Drawing(e.to_string()))?
        .label("Used data")
        .legend(move |(x, y)| Circle::new((x, y), MARKER_SIZE, color.filled()));

    if let (Some((slope, intercept)), Some((lo, hi))) =
        (plot.fit.line(), finite_bounds(used.iter().map(|p| p.0)))
    {
        let fit_color = rgb(style.color_fit);
        chart
            .draw_series(LineSeries::new(
                [lo, hi].map(|x| (x, slope * x + intercept)),
                fit_color.stroke_width(2),
            ))
            .map_err(|e| PlotError::Drawing(e.to_string()))?
            .label("Fit")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], fit_color));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Summary plots
// ---------------------------------------------------------------------------

/// Scatter (optionally connected) of summary rows, axes snapped to nice ticks.
pub fn render_summary_plot(
    path: &Path,
    points: &[(f64, f64)],
    x_label: &str,
    y_label: &str,
    color: [u8; 3],
    connect: bool,
    style: &PlotConfig,
) -> Result<()> {
    let (x_min, x_max) = finite_bounds(points.iter().map(|p| p.0))
        .ok_or_else(|| PlotError::InvalidData("no finite points to plot".to_string()))?;
    let (y_min, y_max) = finite_bounds(points.iter().map(|p| p.1))
        .ok_or_else(|| PlotError::InvalidData("no finite points to plot".to_string()))?;
    let (x0, x1) = nice_limits(x_min, x_max, 0.1);
    let (y0, y1) = nice_limits(y_min, y_max, 0.1);

    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(80)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| PlotError::ChartConfig(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .label_style((FONT, FONT_SIZE_LABEL))
        .y_label_formatter(&|v| format!("{v:.2e}"))
        .draw()
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    let color = rgb(color);
    let finite: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    if connect {
        chart
            .draw_series(LineSeries::new(finite.iter().copied(), color.stroke_width(2)))
            .map_err(|e| PlotError::Drawing(e.to_string()))?;
    }
    chart
        .draw_series(finite.iter().map(|&p| Circle::new(p, MARKER_SIZE + 2, color.filled())))
        .map_err(|e| PlotError::Drawing(e.to_string()))?;

    root.present()
        .map_err(|e| PlotError::DrawingArea(e.to_string()))?;
    log::info!("Saved plot: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_padding() {
        assert_eq!(calculate_range(0.0, 10.0), (-1.5, 11.5));
        assert_eq!(calculate_range(2.0, 2.0), (1.5, 2.5));
        assert_eq!(calculate_range(10.0, 0.0), (-1.5, 11.5));
    }

    #[test]
    fn nice_limits_cover_data() {
        let (lo, hi) = nice_limits(3.2, 47.9, 0.1);
        assert!(lo <= 3.2 - 4.47 && hi >= 47.9 + 4.47);
        assert_eq!(lo, -10.0);
        assert_eq!(hi, 60.0);
    }

    #[test]
    fn nice_limits_for_single_value() {
        let (lo, hi) = nice_limits(5.0, 5.0, 0.1);
        assert!(lo < 5.0 && hi > 5.0);
    }

    #[test]
    fn finite_bounds_skip_nan() {
        let b = finite_bounds([f64::NAN, 2.0, -1.0, f64::INFINITY].into_iter());
        assert_eq!(b, Some((-1.0, 2.0)));
        assert_eq!(finite_bounds(std::iter::empty()), None);
    }

    #[test]
    fn titles_tolerate_absent_fit() {
        assert_eq!(fit_title("Phase", &FitSummary::Absent), "Phase: no fit");
    }
}
