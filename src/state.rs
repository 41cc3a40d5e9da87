use crate::analysis::analyzer::{analyze, TwaSeries};
use crate::analysis::result::AnalysisResult;
use crate::config::AppConfig;
use crate::data::model::RawData;
use crate::error::AnalysisError;

// ---------------------------------------------------------------------------
// Range selector – UI-independent state machine
// ---------------------------------------------------------------------------

/// Inputs the selector reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectorEvent {
    /// Drag-selection over √f; bounds are inclusive and may come reversed.
    RangeSelected { min: f64, max: f64 },
    /// Click on a data point: flip its manual inclusion.
    PointToggled(usize),
    /// The user is done with this file.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorPhase {
    Idle,
    RangeSelected,
    Completed,
}

/// Tracks which rows take part in the fit and keeps the latest result.
///
/// The active selection is `range_mask & manual_mask`; every change
/// recomputes the analysis synchronously.
#[derive(Debug, Clone)]
pub struct RangeSelector {
    raw: RawData,
    config: AppConfig,
    series: TwaSeries,
    range_mask: Vec<bool>,
    manual_mask: Vec<bool>,
    phase: SelectorPhase,
    current: AnalysisResult,
}

impl RangeSelector {
    /// Start in `Idle` with every row selected.
    pub fn new(raw: RawData, config: AppConfig) -> Result<Self, AnalysisError> {
        let series = TwaSeries::extract(&raw, &config)?;
        let n = series.len();
        let current = analyze(&raw, &config, None)?;
        Ok(Self {
            raw,
            config,
            series,
            range_mask: vec![true; n],
            manual_mask: vec![true; n],
            phase: SelectorPhase::Idle,
            current,
        })
    }

    /// Apply one event and return the (possibly recomputed) result.
    pub fn handle(&mut self, event: SelectorEvent) -> Result<&AnalysisResult, AnalysisError> {
        if self.phase == SelectorPhase::Completed {
            log::debug!("Ignoring {event:?} after completion");
            return Ok(&self.current);
        }
        match event {
            SelectorEvent::RangeSelected { min, max } => {
                let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
                self.range_mask = self
                    .series
                    .sqrt_freq
                    .iter()
                    .map(|&x| x >= lo && x <= hi)
                    .collect();
                self.phase = SelectorPhase::RangeSelected;
                self.recompute()?;
            }
            SelectorEvent::PointToggled(index) => {
                let Some(bit) = self.manual_mask.get_mut(index) else {
                    log::warn!("Ignoring toggle of unknown point {index}");
                    return Ok(&self.current);
                };
                *bit = !*bit;
                self.recompute()?;
            }
            SelectorEvent::Completed => {
                self.phase = SelectorPhase::Completed;
            }
        }
        Ok(&self.current)
    }

    fn recompute(&mut self) -> Result<(), AnalysisError> {
        let active = self.active_indices();
        self.current = analyze(&self.raw, &self.config, Some(&active))?;
        log::debug!(
            "Selection changed: {} active points, sufficient = {}",
            active.len(),
            self.current.is_sufficient()
        );
        Ok(())
    }

    /// Rows inside the range and not manually excluded.
    pub fn active_indices(&self) -> Vec<usize> {
        self.range_mask
            .iter()
            .zip(&self.manual_mask)
            .enumerate()
            .filter(|(_, (&r, &m))| r && m)
            .map(|(i, _)| i)
            .collect()
    }

    /// Rows inside the range that the user clicked away.
    pub fn excluded_indices(&self) -> Vec<usize> {
        self.range_mask
            .iter()
            .zip(&self.manual_mask)
            .enumerate()
            .filter(|(_, (&r, &m))| r && !m)
            .map(|(i, _)| i)
            .collect()
    }

    /// Endpoints of the phase fit across the active √f span.
    pub fn fit_line(&self) -> Option<[[f64; 2]; 2]> {
        if !self.current.is_sufficient() {
            return None;
        }
        let (slope, intercept) = self.current.phase.line()?;
        let xs = self.current.used_indices.iter().map(|&i| self.series.sqrt_freq[i]);
        let lo = xs.clone().fold(f64::INFINITY, f64::min);
        let hi = xs.fold(f64::NEG_INFINITY, f64::max);
        Some([[lo, slope * lo + intercept], [hi, slope * hi + intercept]])
    }

    pub fn current(&self) -> &AnalysisResult {
        &self.current
    }

    pub fn phase(&self) -> SelectorPhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SelectorPhase::Completed
    }

    pub fn raw(&self) -> &RawData {
        &self.raw
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn series(&self) -> &TwaSeries {
        &self.series
    }

    /// Consume the selector, yielding the latest result.
    pub fn into_result(self) -> (RawData, AnalysisResult) {
        (self.raw, self.current)
    }
}
