use crate::config::AppConfig;
use crate::data::model::RawData;
use crate::error::AnalysisError;

use super::fitting::fit_subset;
use super::physics::{diffusivity_ratio, kd_from_frequency};
use super::result::{AnalysisResult, FitSummary};

/// The three series every fit needs, extracted by configured column names.
#[derive(Debug, Clone)]
pub struct TwaSeries {
    pub sqrt_freq: Vec<f64>,
    /// Linearised amplitude (see [`AmplitudeTransform`](crate::config::AmplitudeTransform)).
    pub amplitude: Vec<f64>,
    pub phase: Vec<f64>,
}

impl TwaSeries {
    pub fn extract(raw: &RawData, config: &AppConfig) -> Result<Self, AnalysisError> {
        let column = |name: &str| {
            raw.table
                .column(name)
                .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
        };
        // Fall back to √ of the raw frequency column when no √f column exists.
        let sqrt_freq = match raw.table.column(&config.columns.sqrt_frequency) {
            Some(values) => values,
            None => column(&config.columns.frequency)
                .map_err(|_| AnalysisError::MissingColumn(config.columns.sqrt_frequency.clone()))?
                .into_iter()
                .map(f64::sqrt)
                .collect(),
        };
        let amp_raw = column(&config.columns.amplitude)?;
        let phase = column(&config.columns.phase)?;

        let transform = config.analysis.amplitude_transform;
        let amplitude = amp_raw
            .iter()
            .zip(&sqrt_freq)
            .map(|(&a, &x)| transform.apply(a, x))
            .collect();

        Ok(Self {
            sqrt_freq,
            amplitude,
            phase,
        })
    }

    pub fn len(&self) -> usize {
        self.sqrt_freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sqrt_freq.is_empty()
    }
}

/// Sample thickness in µm: metadata entry if present, else the configured default.
pub fn resolve_thickness(raw: &RawData, config: &AppConfig) -> f64 {
    raw.metadata
        .get(&config.analysis.thickness_key)
        .copied()
        .unwrap_or(config.analysis.default_thickness_um)
}

/// Fit phase and amplitude over `used_indices` (all rows when `None`) and
/// derive diffusivities, their ratio, kd bounds and sample position.
///
/// Fewer than two indices is not an error: the result comes back with empty
/// `used_indices` and both fits `Absent`.
pub fn analyze(
    raw: &RawData,
    config: &AppConfig,
    used_indices: Option<&[usize]>,
) -> Result<AnalysisResult, AnalysisError> {
    let series = TwaSeries::extract(raw, config)?;
    let thickness = resolve_thickness(raw, config);

    let indices: Vec<usize> = match used_indices {
        Some(idx) => idx.to_vec(),
        None => (0..series.len()).collect(),
    };
    if let Some(&index) = indices.iter().find(|&&i| i >= series.len()) {
        return Err(AnalysisError::IndexOutOfRange {
            index,
            len: series.len(),
        });
    }

    let filename = raw.source_path.to_string_lossy().into_owned();
    if indices.len() < 2 {
        return Ok(AnalysisResult::insufficient(filename, thickness));
    }

    let fit_phase = fit_subset(&series.sqrt_freq, &series.phase, Some(&indices));
    let fit_amp = fit_subset(&series.sqrt_freq, &series.amplitude, Some(&indices));
    let phase = FitSummary::from_fit(fit_phase, thickness);
    let amplitude = FitSummary::from_fit(fit_amp, thickness);

    let alpha_phase = phase.diffusivity().unwrap_or(f64::NAN);
    let alpha_amp = amplitude.diffusivity().unwrap_or(f64::NAN);

    // x = √f, so f = x².
    let x_sub: Vec<f64> = indices.iter().map(|&i| series.sqrt_freq[i]).collect();
    let freq_sub: Vec<f64> = x_sub.iter().map(|x| x * x).collect();
    let kd = kd_from_frequency(&freq_sub, alpha_phase, thickness);

    let meta = &raw.metadata;
    let result = AnalysisResult {
        filename,
        sample_name: None,
        thickness_um: thickness,
        phase,
        amplitude,
        diffusivity_ratio: diffusivity_ratio(alpha_amp, alpha_phase),
        x_position: meta.get(&config.analysis.x_pos_key).copied(),
        y_position: meta.get(&config.analysis.y_pos_key).copied(),
        z_position: meta.get(&config.analysis.z_pos_key).copied(),
        used_indices: indices,
        freq_range_min: min_of(&x_sub),
        freq_range_max: max_of(&x_sub),
        kd_min: min_of(&kd),
        kd_max: max_of(&kd),
    };
    log::debug!(
        "Analysed {} rows of {}: phase α={:?}, amp α={:?}",
        result.used_indices.len(),
        result.filename,
        alpha_phase,
        alpha_amp
    );
    Ok(result)
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::model::Table;
    use std::collections::BTreeMap;
    use std::f64::consts::PI;
    use std::path::PathBuf;

    /// Rows with phase = -2·√f + 1 and ln(amp) = -2·√f.
    pub(crate) fn linear_raw(n: usize, thickness: Option<f64>) -> RawData {
        let columns = vec![
            "sqrt_TW_freq".to_string(),
            "amp".to_string(),
            "theta".to_string(),
        ];
        let rows = (0..n)
            .map(|i| {
                let x = 1.0 + i as f64;
                vec![x, (-2.0 * x).exp(), -2.0 * x + 1.0]
            })
            .collect();
        let mut metadata = BTreeMap::new();
        if let Some(t) = thickness {
            metadata.insert("試料厚".to_string(), t);
        }
        metadata.insert("x_pos".to_string(), 150.0);
        RawData {
            table: Table::new(columns, rows),
            metadata,
            source_path: PathBuf::from("/data/run_01.txt"),
        }
    }

    #[test]
    fn full_range_fit() {
        let raw = linear_raw(5, Some(26.5));
        let res = analyze(&raw, &AppConfig::default(), None).unwrap();
        assert_eq!(res.used_indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(res.thickness_um, 26.5);
        let (slope, intercept) = res.phase.line().unwrap();
        assert!((slope + 2.0).abs() < 1e-12);
        assert!((intercept - 1.0).abs() < 1e-12);

        let expected = PI * (26.5e-6_f64).powi(2) / 4.0;
        let alpha = res.phase.diffusivity().unwrap();
        assert!((alpha - expected).abs() <= expected * 1e-9);
        assert!((res.diffusivity_ratio - 1.0).abs() < 1e-9);
        assert_eq!(res.freq_range_min, 1.0);
        assert_eq!(res.freq_range_max, 5.0);
        assert!(res.kd_max > res.kd_min && res.kd_min > 0.0);
        assert_eq!(res.x_position, Some(150.0));
        assert_eq!(res.y_position, None);
    }

    #[test]
    fn thickness_falls_back_to_default() {
        let raw = linear_raw(4, None);
        let res = analyze(&raw, &AppConfig::default(), None).unwrap();
        assert_eq!(res.thickness_um, 50.0);
    }

    #[test]
    fn single_index_is_insufficient() {
        let raw = linear_raw(6, Some(10.0));
        let res = analyze(&raw, &AppConfig::default(), Some(&[3])).unwrap();
        assert!(res.used_indices.is_empty());
        assert!(!res.phase.is_present());
        assert!(!res.amplitude.is_present());
        assert_eq!(res.kd_min, 0.0);
        assert_eq!(res.freq_range_max, 0.0);
    }

    #[test]
    fn subset_bounds_follow_indices() {
        let raw = linear_raw(6, Some(10.0));
        let res = analyze(&raw, &AppConfig::default(), Some(&[4, 1, 2])).unwrap();
        assert_eq!(res.used_indices, vec![4, 1, 2]);
        assert_eq!(res.freq_range_min, 2.0);
        assert_eq!(res.freq_range_max, 5.0);
    }

    #[test]
    fn missing_column_is_reported() {
        let raw = linear_raw(4, None);
        let mut cfg = AppConfig::default();
        cfg.columns.phase = "phase".to_string();
        assert_eq!(
            analyze(&raw, &cfg, None).unwrap_err(),
            AnalysisError::MissingColumn("phase".to_string())
        );
    }

    #[test]
    fn sqrt_frequency_derived_from_frequency_column() {
        let mut raw = linear_raw(4, None);
        raw.table.columns[0] = "freq".to_string();
        for row in &mut raw.table.rows {
            row[0] = row[0] * row[0];
        }
        let res = analyze(&raw, &AppConfig::default(), None).unwrap();
        assert_eq!(res.freq_range_min, 1.0);
        assert_eq!(res.freq_range_max, 4.0);
    }

    #[test]
    fn out_of_range_index_is_reported() {
        let raw = linear_raw(4, None);
        assert_eq!(
            analyze(&raw, &AppConfig::default(), Some(&[0, 9])).unwrap_err(),
            AnalysisError::IndexOutOfRange { index: 9, len: 4 }
        );
    }

    #[test]
    fn flat_phase_gives_infinite_diffusivity_and_zero_kd() {
        let mut raw = linear_raw(4, Some(10.0));
        for row in &mut raw.table.rows {
            row[2] = 0.3;
        }
        let res = analyze(&raw, &AppConfig::default(), None).unwrap();
        assert_eq!(res.phase.diffusivity(), Some(f64::INFINITY));
        assert_eq!(res.kd_max, 0.0);
        assert_eq!(res.diffusivity_ratio, 0.0);
    }
}
