//! Run summaries across many saved cases: diffusivity and thickness
//! against one stage axis.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::analysis::result::AnalysisResult;
use crate::config::PlotConfig;
use crate::persist::{self, RESULTS_FILE};
use crate::report;

pub use crate::report::nice_limits;

pub const POSITION_SUMMARY_FILE: &str = "summary_results.json";
pub const POSITION_ALPHA_PLOT: &str = "summary_pos_alpha.png";
pub const POSITION_RATIO_PLOT: &str = "summary_pos_ratio.png";
pub const THICKNESS_SUMMARY_FILE: &str = "summary_thickness.json";

const COLOR_ALPHA: [u8; 3] = [255, 165, 0];
const COLOR_RATIO: [u8; 3] = [0, 128, 0];
const COLOR_THICKNESS: [u8; 3] = [0, 0, 255];

/// Stage axis a summary is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// One-letter name used in file names.
    pub fn short(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::X => "X Position [um]",
            Axis::Y => "Y Position [um]",
            Axis::Z => "Z Position [um]",
        }
    }

    pub fn position(self, result: &AnalysisResult) -> Option<f64> {
        match self {
            Axis::X => result.x_position,
            Axis::Y => result.y_position,
            Axis::Z => result.z_position,
        }
    }
}

impl FromStr for Axis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "x_pos" | "x_position" => Ok(Axis::X),
            "y" | "y_pos" | "y_position" => Ok(Axis::Y),
            "z" | "z_pos" | "z_position" => Ok(Axis::Z),
            other => bail!("unknown axis {other:?} (expected x, y or z)"),
        }
    }
}

/// A saved result and the case directory it came from.
#[derive(Debug, Clone)]
pub struct CaseResult {
    /// Name of the directory holding `results.json`.
    pub id: String,
    pub path: PathBuf,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionRow {
    pub id: String,
    pub position: f64,
    pub alpha_phase: f64,
    pub alpha_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThicknessRow {
    pub id: String,
    pub position: f64,
    pub thickness_um: f64,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// Recursively load every `results.json` under `root`, sorted by path.
/// Unreadable files are logged and skipped.
pub fn collect_results(root: &Path) -> Result<Vec<CaseResult>> {
    if !root.is_dir() {
        bail!("directory not found: {}", root.display());
    }
    let mut files = Vec::new();
    find_results(root, &mut files)?;
    files.sort();

    let mut cases = Vec::with_capacity(files.len());
    for path in files {
        match persist::load_result(&path) {
            Ok(result) => {
                let id = path
                    .parent()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                cases.push(CaseResult { id, path, result });
            }
            Err(e) => log::warn!("Failed to read {}: {e}", path.display()),
        }
    }
    log::info!("Collected {} result(s) under {}", cases.len(), root.display());
    Ok(cases)
}

fn find_results(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;
    for entry in entries {
        let path = entry
            .with_context(|| format!("reading directory {}", dir.display()))?
            .path();
        if path.is_dir() {
            find_results(&path, out)?;
        } else if path.file_name().is_some_and(|n| n == RESULTS_FILE) {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Phase diffusivity and ratio per position. Cases without the position or
/// without a phase diffusivity are dropped. Sorted by position.
pub fn position_summary(cases: &[CaseResult], axis: Axis) -> Vec<PositionRow> {
    let mut rows: Vec<PositionRow> = cases
        .iter()
        .filter_map(|case| {
            let position = axis.position(&case.result)?;
            let alpha_phase = case.result.phase.diffusivity()?;
            Some(PositionRow {
                id: case.id.clone(),
                position,
                alpha_phase,
                alpha_ratio: case.result.diffusivity_ratio,
            })
        })
        .collect();
    rows.sort_by(|a, b| a.position.total_cmp(&b.position));
    rows
}

/// Thickness per position, sorted by position.
pub fn thickness_summary(cases: &[CaseResult], axis: Axis) -> Vec<ThicknessRow> {
    let mut rows: Vec<ThicknessRow> = cases
        .iter()
        .filter_map(|case| {
            Some(ThicknessRow {
                id: case.id.clone(),
                position: axis.position(&case.result)?,
                thickness_um: case.result.thickness_um,
            })
        })
        .collect();
    rows.sort_by(|a, b| a.position.total_cmp(&b.position));
    rows
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write `summary_results.json` and the α / ratio plots into `root`.
/// Returns the paths written; plot failures are logged.
pub fn write_position_summary(
    root: &Path,
    rows: &[PositionRow],
    axis: Axis,
    style: &PlotConfig,
) -> Result<Vec<PathBuf>> {
    let json = root.join(POSITION_SUMMARY_FILE);
    persist::write_json(&json, &rows)?;
    log::info!("Saved summary: {}", json.display());
    let mut written = vec![json];

    let alpha: Vec<(f64, f64)> = rows.iter().map(|r| (r.position, r.alpha_phase)).collect();
    let ratio: Vec<(f64, f64)> = rows.iter().map(|r| (r.position, r.alpha_ratio)).collect();
    let plots = [
        (POSITION_ALPHA_PLOT, alpha, "Thermal Diffusivity [m²/s]", COLOR_ALPHA),
        (POSITION_RATIO_PLOT, ratio, "Alpha Ratio", COLOR_RATIO),
    ];
    for (file, points, y_label, color) in plots {
        let path = root.join(file);
        match report::render_summary_plot(&path, &points, axis.label(), y_label, color, true, style)
        {
            Ok(()) => written.push(path),
            Err(e) => log::warn!("{} not written: {e}", path.display()),
        }
    }
    Ok(written)
}

/// Write `summary_thickness.json` and `summary_<axis>_vs_thickness.png` into `root`.
pub fn write_thickness_summary(
    root: &Path,
    rows: &[ThicknessRow],
    axis: Axis,
    style: &PlotConfig,
) -> Result<Vec<PathBuf>> {
    let json = root.join(THICKNESS_SUMMARY_FILE);
    persist::write_json(&json, &rows)?;
    log::info!("Saved summary: {}", json.display());
    let mut written = vec![json];

    let points: Vec<(f64, f64)> = rows.iter().map(|r| (r.position, r.thickness_um)).collect();
    let path = root.join(format!("summary_{}_vs_thickness.png", axis.short()));
    match report::render_summary_plot(
        &path,
        &points,
        axis.label(),
        "Sample Thickness [um]",
        COLOR_THICKNESS,
        false,
        style,
    ) {
        Ok(()) => written.push(path),
        Err(e) => log::warn!("{} not written: {e}", path.display()),
    }
    Ok(written)
}
