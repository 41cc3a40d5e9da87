use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "TWA_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "twa.json";

// ---------------------------------------------------------------------------
// Configuration sections
// ---------------------------------------------------------------------------

/// Where input files are looked up and where results go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Extension (without dot) of instrument files when scanning a directory.
    pub target_ext: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data").join("input"),
            output_dir: PathBuf::from("data").join("output"),
            target_ext: "txt".to_string(),
        }
    }
}

/// Column headers of the instrument table, after prefix stripping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub frequency: String,
    pub sqrt_frequency: String,
    pub amplitude: String,
    pub phase: String,
    pub separator: char,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            frequency: "freq".to_string(),
            sqrt_frequency: "sqrt_TW_freq".to_string(),
            amplitude: "amp".to_string(),
            phase: "theta".to_string(),
            separator: '\t',
        }
    }
}

/// How the amplitude column is linearised before fitting against √f.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeTransform {
    /// `ln(A)`
    #[default]
    Log,
    /// `ln(A·√f)`
    LogSqrtFrequency,
}

impl AmplitudeTransform {
    pub fn apply(self, amplitude: f64, sqrt_freq: f64) -> f64 {
        match self {
            AmplitudeTransform::Log => amplitude.ln(),
            AmplitudeTransform::LogSqrtFrequency => (amplitude * sqrt_freq).ln(),
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            AmplitudeTransform::Log => "ln(Amplitude)",
            AmplitudeTransform::LogSqrtFrequency => "ln(Amplitude·√f)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Used when the metadata carries no thickness entry.
    pub default_thickness_um: f64,
    pub thickness_key: String,
    pub x_pos_key: String,
    pub y_pos_key: String,
    pub z_pos_key: String,
    pub amplitude_transform: AmplitudeTransform,
    pub phase_period: f64,
    /// Must stay above `phase_period / 2` to leave real fast transitions alone.
    pub phase_jump_threshold: f64,
    /// Fits below this R² are flagged in the UI and the log.
    pub r2_threshold: f64,
    /// Persist a result with fewer than 2 points as a skip marker.
    pub persist_insufficient: bool,
    /// Open the selector window for each file; otherwise use the full range.
    pub interactive: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_thickness_um: 50.0,
            thickness_key: "試料厚".to_string(),
            x_pos_key: "x_pos".to_string(),
            y_pos_key: "y_pos".to_string(),
            z_pos_key: "z_pos".to_string(),
            amplitude_transform: AmplitudeTransform::Log,
            phase_period: std::f64::consts::PI,
            phase_jump_threshold: 3.0,
            r2_threshold: 0.90,
            persist_insufficient: false,
            interactive: true,
        }
    }
}

/// PNG output settings. Colours are RGB triples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Write `phase_plot.png` / `amplitude_plot.png` next to each result.
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
    pub color_amplitude: [u8; 3],
    pub color_phase: [u8; 3],
    pub color_fit: [u8; 3],
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 1000,
            height: 600,
            color_amplitude: [31, 119, 180],
            color_phase: [255, 127, 14],
            color_fit: [214, 39, 40],
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Complete, immutable configuration passed explicitly to every stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathConfig,
    pub columns: ColumnConfig,
    pub analysis: AnalysisConfig,
    pub plot: PlotConfig,
}

impl AppConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$TWA_CONFIG`, then `./twa.json`, then built-in defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            log::info!("Using config from ${CONFIG_ENV_VAR}: {}", path.display());
            return Self::load(&path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            log::info!("Using config {}", local.display());
            return Self::load(local);
        }
        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AppConfig = serde_json::from_str(
            r#"{ "columns": { "separator": "," }, "analysis": { "amplitude_transform": "log_sqrt_frequency" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.columns.separator, ',');
        assert_eq!(cfg.columns.phase, "theta");
        assert_eq!(cfg.analysis.amplitude_transform, AmplitudeTransform::LogSqrtFrequency);
        assert_eq!(cfg.analysis.default_thickness_um, 50.0);
        assert_eq!(cfg.paths, PathConfig::default());
    }

    #[test]
    fn load_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twa.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Json { .. })));
    }

    #[test]
    fn amplitude_transforms() {
        let a = 2.0_f64;
        assert_eq!(AmplitudeTransform::Log.apply(a, 3.0), a.ln());
        assert_eq!(AmplitudeTransform::LogSqrtFrequency.apply(a, 3.0), (a * 3.0).ln());
    }
}
