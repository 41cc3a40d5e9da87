//! Sequential driver: parse → select → persist, one file at a time.
//!
//! Every per-file failure is logged and recorded in the [`BatchReport`];
//! the batch always moves on to the next file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::analysis::result::AnalysisResult;
use crate::config::AppConfig;
use crate::data::model::RawData;
use crate::data::parser::parse_with_config;
use crate::error::PersistError;
use crate::persist::{self, SavedArtifacts};
use crate::report;
use crate::state::{RangeSelector, SelectorEvent};

// ---------------------------------------------------------------------------
// Session runners
// ---------------------------------------------------------------------------

/// Drives one selection session to completion.
pub trait SessionRunner {
    /// Hand the selector to the user (or a policy) and return it once done.
    /// `case_dir` is where an intermediate "Save" should write.
    fn run(&mut self, selector: RangeSelector, case_dir: &Path) -> Result<RangeSelector>;
}

/// Accepts the full range without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullRangeRunner;

impl SessionRunner for FullRangeRunner {
    fn run(&mut self, mut selector: RangeSelector, _case_dir: &Path) -> Result<RangeSelector> {
        selector.handle(SelectorEvent::Completed)?;
        Ok(selector)
    }
}

// ---------------------------------------------------------------------------
// Per-file processing
// ---------------------------------------------------------------------------

/// Everything [`persist_case`] can leave in a case directory.
const CASE_FILES: [&str; 5] = [
    persist::RESULTS_FILE,
    persist::INPUT_DATA_FILE,
    persist::RAW_COPY_FILE,
    report::PHASE_PLOT_FILE,
    report::AMPLITUDE_PLOT_FILE,
];

#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Saved(SavedArtifacts),
    /// Fewer than 2 points were left selected and skip markers are off.
    Insufficient,
}

/// Write the artifacts for one case, plus PNG plots when enabled.
/// Plot failures are logged, not returned.
pub fn persist_case(
    result: &AnalysisResult,
    raw: &RawData,
    case_dir: &Path,
    config: &AppConfig,
) -> Result<SavedArtifacts, PersistError> {
    let saved = persist::save(result, raw, case_dir)?;
    if config.plot.enabled {
        match crate::analysis::analyzer::TwaSeries::extract(raw, config) {
            Ok(series) => {
                if let Err(e) = report::render_diagnostics(case_dir, &series, result, config) {
                    log::warn!("Plots for {} not written: {e}", case_dir.display());
                }
            }
            Err(e) => log::warn!("Plots for {} not written: {e}", case_dir.display()),
        }
    }
    Ok(saved)
}

/// Parse, select and persist a single input file under `output_root/<stem>/`.
pub fn process_file(
    path: &Path,
    output_root: &Path,
    config: &AppConfig,
    runner: &mut dyn SessionRunner,
) -> Result<FileOutcome> {
    log::info!("Opening: {}", path.display());
    let raw = parse_with_config(path, config)
        .with_context(|| format!("parsing {}", path.display()))?;
    let case_name = raw.case_name();
    let case_dir = output_root.join(&case_name);

    let selector = RangeSelector::new(raw, config.clone())
        .with_context(|| format!("analysing {}", path.display()))?;
    let selector = runner.run(selector, &case_dir)?;
    let (raw, mut result) = selector.into_result();
    result.sample_name = Some(case_name);

    if !result.is_sufficient() && !config.analysis.persist_insufficient {
        log::warn!(
            "{}: fewer than 2 points selected, nothing saved",
            path.display()
        );
        // An earlier manual save must not outlive the final selection.
        persist::discard(&case_dir, &CASE_FILES)
            .with_context(|| format!("clearing stale results for {}", path.display()))?;
        return Ok(FileOutcome::Insufficient);
    }
    for (name, r2) in [
        ("phase", result.phase.r_squared()),
        ("amplitude", result.amplitude.r_squared()),
    ] {
        if let Some(r2) = r2.filter(|&r2| r2 < config.analysis.r2_threshold) {
            log::warn!(
                "{}: {name} fit R² = {r2:.3} is below {:.2}",
                path.display(),
                config.analysis.r2_threshold
            );
        }
    }

    let saved = persist_case(&result, &raw, &case_dir, config)
        .with_context(|| format!("saving results for {}", path.display()))?;
    Ok(FileOutcome::Saved(saved))
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct BatchReport {
    pub saved: Vec<PathBuf>,
    pub insufficient: Vec<PathBuf>,
    /// Input path and the rendered error chain.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.saved.len() + self.insufficient.len() + self.failed.len()
    }
}

/// Process every input in order. Never stops early on a per-file error.
pub fn run_batch(
    inputs: &[PathBuf],
    output_root: &Path,
    config: &AppConfig,
    runner: &mut dyn SessionRunner,
) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, path) in inputs.iter().enumerate() {
        log::info!("[{}/{}] {}", i + 1, inputs.len(), path.display());
        match process_file(path, output_root, config, runner) {
            Ok(FileOutcome::Saved(_)) => report.saved.push(path.clone()),
            Ok(FileOutcome::Insufficient) => report.insufficient.push(path.clone()),
            Err(e) => {
                log::error!("Skipping {}: {e:#}", path.display());
                report.failed.push((path.clone(), format!("{e:#}")));
            }
        }
    }
    log::info!(
        "Batch finished: {} saved, {} insufficient, {} failed",
        report.saved.len(),
        report.insufficient.len(),
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Selects a fixed √f window, like a user dragging once.
    struct WindowRunner(f64, f64);

    impl SessionRunner for WindowRunner {
        fn run(&mut self, mut selector: RangeSelector, _case_dir: &Path) -> Result<RangeSelector> {
            selector.handle(SelectorEvent::RangeSelected {
                min: self.0,
                max: self.1,
            })?;
            selector.handle(SelectorEvent::Completed)?;
            Ok(selector)
        }
    }

    fn headless_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.plot.enabled = false;
        cfg
    }

    fn write_case(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut text = String::from("sqrt_TW_freq\tamp\ttheta\n");
        for i in 1..=5 {
            let x = i as f64;
            text.push_str(&format!("{x}\t{}\t{}\n", (-x).exp(), -x));
        }
        text.push_str("sample information\nx_pos\t12.5\n");
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn full_range_runner_saves_case() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_case(dir.path(), "a.txt");
        let out = dir.path().join("out");
        let outcome =
            process_file(&input, &out, &headless_config(), &mut FullRangeRunner).unwrap();
        let FileOutcome::Saved(saved) = outcome else {
            panic!("expected saved outcome");
        };
        assert_eq!(saved.results, out.join("a").join("results.json"));
        let result = persist::load_result(&saved.results).unwrap();
        assert_eq!(result.sample_name.as_deref(), Some("a"));
        assert_eq!(result.x_position, Some(12.5));
    }

    #[test]
    fn insufficient_selection_is_not_saved_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_case(dir.path(), "a.txt");
        let out = dir.path().join("out");
        let outcome =
            process_file(&input, &out, &headless_config(), &mut WindowRunner(2.5, 3.5)).unwrap();
        assert_eq!(outcome, FileOutcome::Insufficient);
        assert!(!out.join("a").exists());
    }

    #[test]
    fn insufficient_selection_saved_as_marker_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_case(dir.path(), "a.txt");
        let out = dir.path().join("out");
        let mut cfg = headless_config();
        cfg.analysis.persist_insufficient = true;
        let outcome = process_file(&input, &out, &cfg, &mut WindowRunner(2.5, 3.5)).unwrap();
        let FileOutcome::Saved(saved) = outcome else {
            panic!("expected saved outcome");
        };
        let result = persist::load_result(&saved.results).unwrap();
        assert!(result.used_indices.is_empty());
        assert!(!result.phase.is_present());
    }

    /// Saves at full range, then narrows to a single point, like a user
    /// pressing Save before changing their mind.
    struct SaveThenNarrowRunner;

    impl SessionRunner for SaveThenNarrowRunner {
        fn run(&mut self, mut selector: RangeSelector, case_dir: &Path) -> Result<RangeSelector> {
            let mut early = selector.current().clone();
            early.sample_name = Some(selector.raw().case_name());
            persist_case(&early, selector.raw(), case_dir, selector.config())?;
            selector.handle(SelectorEvent::RangeSelected { min: 2.5, max: 3.5 })?;
            selector.handle(SelectorEvent::Completed)?;
            Ok(selector)
        }
    }

    #[test]
    fn earlier_save_is_removed_when_final_selection_is_insufficient() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_case(dir.path(), "a.txt");
        let out = dir.path().join("out");
        let outcome =
            process_file(&input, &out, &headless_config(), &mut SaveThenNarrowRunner).unwrap();
        assert_eq!(outcome, FileOutcome::Insufficient);
        assert!(!out.join("a").join(persist::RESULTS_FILE).exists());
        assert!(!out.join("a").exists());
        assert!(crate::summary::collect_results(&out).unwrap().is_empty());
    }

    #[test]
    fn batch_continues_after_persist_failures() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_case(dir.path(), "a.txt");
        let second = write_case(dir.path(), "b.txt");

        // Output root is a plain file: nothing can be created below it.
        let root_file = dir.path().join("out_file");
        std::fs::write(&root_file, "not a directory").unwrap();
        let inputs = vec![first.clone(), second.clone()];
        let report = run_batch(&inputs, &root_file, &headless_config(), &mut FullRangeRunner);
        assert!(report.saved.is_empty());
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed[0].1.contains("saving results"));

        // A file squatting on one case directory only fails that case.
        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("a"), "blocker").unwrap();
        let report = run_batch(&inputs, &out, &headless_config(), &mut FullRangeRunner);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, first);
        assert_eq!(report.saved, vec![second]);
    }

    #[test]
    fn batch_continues_after_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_case(dir.path(), "good.txt");
        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "").unwrap();
        let missing = dir.path().join("missing.txt");
        let also_good = write_case(dir.path(), "z_good.txt");

        let inputs = vec![empty.clone(), good.clone(), missing.clone(), also_good.clone()];
        let report = run_batch(
            &inputs,
            &dir.path().join("out"),
            &headless_config(),
            &mut FullRangeRunner,
        );
        assert_eq!(report.saved, vec![good, also_good]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, empty);
        assert_eq!(report.failed[1].0, missing);
        assert_eq!(report.total(), 4);
    }
}
