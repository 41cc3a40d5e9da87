use std::f64::consts::PI;

const UM_TO_M: f64 = 1e-6;

/// Thermal diffusivity (m²/s) from a TWA slope against √f.
///
/// `slope = -L·√(π/α)`  ⇒  `α = π·L² / slope²`. A zero slope yields `+∞`.
pub fn diffusivity_from_slope(slope: f64, thickness_um: f64) -> f64 {
    let l = thickness_um * UM_TO_M;
    PI * l.powi(2) / slope.powi(2)
}

/// `kd = L·√(π·f/α)` for each frequency in Hz.
///
/// A non-positive or non-finite `alpha` gives all zeros.
pub fn kd_from_frequency(freqs_hz: &[f64], alpha: f64, thickness_um: f64) -> Vec<f64> {
    if !(alpha.is_finite() && alpha > 0.0) {
        return vec![0.0; freqs_hz.len()];
    }
    let l = thickness_um * UM_TO_M;
    freqs_hz.iter().map(|&f| l * (PI * f / alpha).sqrt()).collect()
}

/// Smaller over larger of two diffusivities; 0 unless both are positive and finite.
pub fn diffusivity_ratio(a: f64, b: f64) -> f64 {
    if a > 0.0 && b > 0.0 && a.is_finite() && b.is_finite() {
        a.min(b) / a.max(b)
    } else {
        0.0
    }
}
