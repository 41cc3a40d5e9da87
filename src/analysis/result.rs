use serde::{Deserialize, Serialize};

use super::fitting::FitResult;
use super::physics::diffusivity_from_slope;

// ---------------------------------------------------------------------------
// FitSummary – one fitted model, or nothing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitSummary {
    Present {
        slope: f64,
        intercept: f64,
        r_squared: f64,
        /// m²/s; may be non-finite for a zero slope.
        diffusivity: f64,
    },
    Absent,
}

impl FitSummary {
    /// Convert a regression into a summary; invalid fits become `Absent`.
    pub fn from_fit(fit: FitResult, thickness_um: f64) -> Self {
        if !fit.is_valid {
            return FitSummary::Absent;
        }
        FitSummary::Present {
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            diffusivity: diffusivity_from_slope(fit.slope, thickness_um),
        }
    }

    pub fn diffusivity(&self) -> Option<f64> {
        match self {
            FitSummary::Present { diffusivity, .. } => Some(*diffusivity),
            FitSummary::Absent => None,
        }
    }

    pub fn r_squared(&self) -> Option<f64> {
        match self {
            FitSummary::Present { r_squared, .. } => Some(*r_squared),
            FitSummary::Absent => None,
        }
    }

    /// `(slope, intercept)` of the fitted line.
    pub fn line(&self) -> Option<(f64, f64)> {
        match self {
            FitSummary::Present {
                slope, intercept, ..
            } => Some((*slope, *intercept)),
            FitSummary::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FitSummary::Present { .. })
    }

    fn parts(&self) -> [Option<f64>; 4] {
        match *self {
            FitSummary::Present {
                slope,
                intercept,
                r_squared,
                diffusivity,
            } => [Some(slope), Some(intercept), Some(r_squared), Some(diffusivity)],
            FitSummary::Absent => [None; 4],
        }
    }

    fn from_parts(parts: [Option<f64>; 4]) -> Self {
        match parts {
            [Some(slope), Some(intercept), Some(r_squared), Some(diffusivity)] => {
                FitSummary::Present {
                    slope,
                    intercept,
                    r_squared,
                    diffusivity,
                }
            }
            _ => FitSummary::Absent,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

/// Outcome of one analysis run over a selection of rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub filename: String,
    pub sample_name: Option<String>,
    pub thickness_um: f64,
    pub phase: FitSummary,
    pub amplitude: FitSummary,
    /// min/max of the two diffusivities, 0 when either is non-positive.
    pub diffusivity_ratio: f64,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub z_position: Option<f64>,
    /// Rows that fed both fits; empty when fewer than 2 were selected.
    pub used_indices: Vec<usize>,
    /// Bounds of the used rows, in √f units.
    pub freq_range_min: f64,
    pub freq_range_max: f64,
    pub kd_min: f64,
    pub kd_max: f64,
}

impl AnalysisResult {
    /// The "not enough points" state: nothing fitted, all ranges zero.
    pub fn insufficient(filename: String, thickness_um: f64) -> Self {
        Self {
            filename,
            sample_name: None,
            thickness_um,
            phase: FitSummary::Absent,
            amplitude: FitSummary::Absent,
            diffusivity_ratio: 0.0,
            x_position: None,
            y_position: None,
            z_position: None,
            used_indices: Vec::new(),
            freq_range_min: 0.0,
            freq_range_max: 0.0,
            kd_min: 0.0,
            kd_max: 0.0,
        }
    }

    pub fn is_sufficient(&self) -> bool {
        self.used_indices.len() >= 2
    }

    /// Human-readable lines for the selector window and the log.
    pub fn summary_lines(&self) -> Vec<String> {
        if !self.is_sufficient() {
            return vec!["Select at least 2 points".to_string()];
        }
        vec![
            format!(
                "Phase α: {} (R²={})",
                fmt_sci(self.phase.diffusivity()),
                fmt_fixed(self.phase.r_squared(), 3)
            ),
            format!(
                "Amp α: {} (R²={}) | Ratio: {:.2}",
                fmt_sci(self.amplitude.diffusivity()),
                fmt_fixed(self.amplitude.r_squared(), 3),
                self.diffusivity_ratio
            ),
            format!("kd: {:.2} - {:.2}", self.kd_min, self.kd_max),
        ]
    }
}

fn fmt_sci(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2e}")).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_fixed(v: Option<f64>, digits: usize) -> String {
    v.map(|v| format!("{v:.digits$}"))
        .unwrap_or_else(|| "n/a".to_string())
}

// ---------------------------------------------------------------------------
// ResultRecord – flat JSON shape of results.json
// ---------------------------------------------------------------------------

/// Flat, serialisable view of an [`AnalysisResult`].
///
/// Non-finite numbers serialise as `null`. Older result files used
/// `alpha_phase` / `slope_amp`-style keys; those are accepted on read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub filename: String,
    #[serde(default, alias = "samplename")]
    pub sample_name: Option<String>,
    #[serde(default)]
    pub thickness_um: Option<f64>,

    #[serde(default, alias = "slope_phase")]
    pub phase_slope: Option<f64>,
    #[serde(default, alias = "intercept_phase")]
    pub phase_intercept: Option<f64>,
    #[serde(default, alias = "r2_phase")]
    pub phase_r2: Option<f64>,
    #[serde(default, alias = "alpha_phase")]
    pub phase_diffusivity: Option<f64>,

    #[serde(default, alias = "slope_amp")]
    pub amplitude_slope: Option<f64>,
    #[serde(default, alias = "intercept_amp")]
    pub amplitude_intercept: Option<f64>,
    #[serde(default, alias = "r2_amp")]
    pub amplitude_r2: Option<f64>,
    #[serde(default, alias = "alpha_amp")]
    pub amplitude_diffusivity: Option<f64>,

    #[serde(default, alias = "alpha_ratio")]
    pub diffusivity_ratio: Option<f64>,

    #[serde(default)]
    pub x_position: Option<f64>,
    #[serde(default)]
    pub y_position: Option<f64>,
    #[serde(default)]
    pub z_position: Option<f64>,

    #[serde(default)]
    pub used_indices: Vec<usize>,
    #[serde(default)]
    pub freq_range_min: Option<f64>,
    #[serde(default)]
    pub freq_range_max: Option<f64>,
    #[serde(default)]
    pub kd_min: Option<f64>,
    #[serde(default)]
    pub kd_max: Option<f64>,
}

impl From<&AnalysisResult> for ResultRecord {
    fn from(r: &AnalysisResult) -> Self {
        let [phase_slope, phase_intercept, phase_r2, phase_diffusivity] = r.phase.parts();
        let [amplitude_slope, amplitude_intercept, amplitude_r2, amplitude_diffusivity] =
            r.amplitude.parts();
        Self {
            filename: r.filename.clone(),
            sample_name: r.sample_name.clone(),
            thickness_um: Some(r.thickness_um),
            phase_slope,
            phase_intercept,
            phase_r2,
            phase_diffusivity,
            amplitude_slope,
            amplitude_intercept,
            amplitude_r2,
            amplitude_diffusivity,
            diffusivity_ratio: Some(r.diffusivity_ratio),
            x_position: r.x_position,
            y_position: r.y_position,
            z_position: r.z_position,
            used_indices: r.used_indices.clone(),
            freq_range_min: Some(r.freq_range_min),
            freq_range_max: Some(r.freq_range_max),
            kd_min: Some(r.kd_min),
            kd_max: Some(r.kd_max),
        }
    }
}

impl From<ResultRecord> for AnalysisResult {
    fn from(r: ResultRecord) -> Self {
        Self {
            filename: r.filename,
            sample_name: r.sample_name,
            thickness_um: r.thickness_um.unwrap_or(f64::NAN),
            phase: FitSummary::from_parts([
                r.phase_slope,
                r.phase_intercept,
                r.phase_r2,
                r.phase_diffusivity,
            ]),
            amplitude: FitSummary::from_parts([
                r.amplitude_slope,
                r.amplitude_intercept,
                r.amplitude_r2,
                r.amplitude_diffusivity,
            ]),
            diffusivity_ratio: r.diffusivity_ratio.unwrap_or(0.0),
            x_position: r.x_position,
            y_position: r.y_position,
            z_position: r.z_position,
            used_indices: r.used_indices,
            freq_range_min: r.freq_range_min.unwrap_or(0.0),
            freq_range_max: r.freq_range_max.unwrap_or(0.0),
            kd_min: r.kd_min.unwrap_or(0.0),
            kd_max: r.kd_max.unwrap_or(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            phase: FitSummary::Present {
                slope: -2.0,
                intercept: 0.5,
                r_squared: 0.99,
                diffusivity: 1.5e-7,
            },
            amplitude: FitSummary::Absent,
            x_position: Some(12.0),
            used_indices: vec![1, 2, 3],
            freq_range_min: 1.0,
            freq_range_max: 3.0,
            ..AnalysisResult::insufficient("run.txt".into(), 26.5)
        }
    }

    #[test]
    fn record_is_flat_json() {
        let json = serde_json::to_value(ResultRecord::from(&sample())).unwrap();
        assert_eq!(json["phase_diffusivity"], 1.5e-7);
        assert_eq!(json["amplitude_slope"], serde_json::Value::Null);
        assert_eq!(json["used_indices"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["thickness_um"], 26.5);
    }

    #[test]
    fn infinite_diffusivity_serialises_as_null() {
        let mut r = sample();
        r.phase = FitSummary::Present {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
            diffusivity: f64::INFINITY,
        };
        let text = serde_json::to_string(&ResultRecord::from(&r)).unwrap();
        assert!(text.contains("\"phase_diffusivity\":null"));
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let record: ResultRecord = serde_json::from_str(
            r#"{"filename": "a.txt", "samplename": "A", "alpha_phase": 2e-7, "alpha_ratio": 0.8,
                "slope_phase": -1.0, "intercept_phase": 0.1, "r2_phase": 0.97, "x_position": 5.0}"#,
        )
        .unwrap();
        let result = AnalysisResult::from(record);
        assert_eq!(result.sample_name.as_deref(), Some("A"));
        assert_eq!(result.phase.diffusivity(), Some(2e-7));
        assert_eq!(result.diffusivity_ratio, 0.8);
        assert!(!result.amplitude.is_present());
    }

    #[test]
    fn summary_lines_for_insufficient_result() {
        let r = AnalysisResult::insufficient("a".into(), 1.0);
        assert_eq!(r.summary_lines(), vec!["Select at least 2 points"]);
    }

    #[test]
    fn summary_lines_tolerate_non_finite_values() {
        let mut r = sample();
        r.phase = FitSummary::Present {
            slope: 0.0,
            intercept: 0.0,
            r_squared: f64::NAN,
            diffusivity: f64::INFINITY,
        };
        let lines = r.summary_lines();
        assert!(lines[0].contains("inf"));
        assert!(lines[1].contains("n/a"));
    }
}
