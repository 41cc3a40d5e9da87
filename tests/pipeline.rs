//! End-to-end runs through the public API with scratch directories.

use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use twa_analyzer::analysis::analyzer::analyze;
use twa_analyzer::batch::{run_batch, FullRangeRunner, SessionRunner};
use twa_analyzer::config::AppConfig;
use twa_analyzer::data::parser::parse_with_config;
use twa_analyzer::persist::{self, INPUT_DATA_FILE, RAW_COPY_FILE, RESULTS_FILE};
use twa_analyzer::state::{RangeSelector, SelectorEvent, SelectorPhase};
use twa_analyzer::summary::{collect_results, position_summary, Axis};

/// Phase = -0.5·√f + 1, ln(amp) = -0.5·√f, six rows, 20 µm thick.
fn write_measurement(dir: &Path, name: &str, x_pos: f64) -> PathBuf {
    let mut text = String::from("TWA1_freq\tTWA1_sqrt_TW_freq\tTWA1_amp\tTWA1_theta\n");
    for i in 1..=6 {
        let x = i as f64;
        text.push_str(&format!(
            "{}\t{x}\t{}\t{}\n",
            x * x,
            (-0.5 * x).exp(),
            -0.5 * x + 1.0
        ));
    }
    text.push_str("---- sample information ----\n");
    text.push_str("試料厚\t20\n");
    text.push_str(&format!("x_pos\t{x_pos}\n"));
    text.push_str("operator\tsato\n");
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn headless() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.plot.enabled = false;
    cfg.analysis.interactive = false;
    cfg
}

#[test]
fn parse_strips_prefix_and_keeps_numeric_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_measurement(dir.path(), "m.txt", 12.0);
    let raw = parse_with_config(&path, &headless()).unwrap();

    assert_eq!(raw.table.columns, vec!["freq", "sqrt_TW_freq", "amp", "theta"]);
    assert_eq!(raw.table.len(), 6);
    assert_eq!(raw.metadata.len(), 2);
    assert_eq!(raw.metadata["試料厚"], 20.0);
    assert_eq!(raw.metadata["x_pos"], 12.0);
    assert!(!raw.metadata.contains_key("operator"));
}

#[test]
fn analysis_recovers_known_diffusivity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_measurement(dir.path(), "m.txt", 0.0);
    let cfg = headless();
    let raw = parse_with_config(&path, &cfg).unwrap();
    let res = analyze(&raw, &cfg, None).unwrap();

    let expected = PI * (20e-6_f64).powi(2) / 0.25;
    let alpha = res.phase.diffusivity().unwrap();
    assert!((alpha - expected).abs() <= expected * 1e-9);
    assert!((res.diffusivity_ratio - 1.0).abs() < 1e-9);
    assert!((res.phase.r_squared().unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn selector_then_save_then_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_measurement(dir.path(), "case_7.txt", 3.0);
    let cfg = headless();
    let raw = parse_with_config(&path, &cfg).unwrap();

    let mut selector = RangeSelector::new(raw, cfg).unwrap();
    selector
        .handle(SelectorEvent::RangeSelected { min: 1.5, max: 5.5 })
        .unwrap();
    let res = selector.handle(SelectorEvent::PointToggled(3)).unwrap();
    assert_eq!(res.used_indices, vec![1, 2, 4]);
    selector.handle(SelectorEvent::Completed).unwrap();
    assert_eq!(selector.phase(), SelectorPhase::Completed);

    let (raw, result) = selector.into_result();
    let dest = dir.path().join("out").join("deep").join("case_7");
    let saved = persist::save(&result, &raw, &dest).unwrap();
    assert_eq!(saved.results, dest.join(RESULTS_FILE));
    assert!(dest.join(INPUT_DATA_FILE).is_file());
    assert_eq!(
        std::fs::read(dest.join(RAW_COPY_FILE)).unwrap(),
        std::fs::read(&path).unwrap()
    );

    let reloaded = persist::load_result(&saved.results).unwrap();
    assert_eq!(reloaded.used_indices, vec![1, 2, 4]);
    assert_eq!(reloaded.freq_range_min, 2.0);
    assert_eq!(reloaded.freq_range_max, 5.0);
    assert_eq!(reloaded.x_position, Some(3.0));

    let raw_back = persist::load_input_data(&dest.join(INPUT_DATA_FILE)).unwrap();
    assert_eq!(raw_back.table, raw.table);
    assert_eq!(raw_back.metadata, raw.metadata);
}

#[test]
fn batch_then_summary() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    std::fs::create_dir(&input).unwrap();
    let inputs = vec![
        write_measurement(&input, "b.txt", 200.0),
        write_measurement(&input, "a.txt", 100.0),
        input.join("not_there.txt"),
    ];
    let out = dir.path().join("out");

    let mut runner = FullRangeRunner;
    let runner: &mut dyn SessionRunner = &mut runner;
    let report = run_batch(&inputs, &out, &headless(), runner);
    assert_eq!(report.saved.len(), 2);
    assert_eq!(report.failed.len(), 1);

    let cases = collect_results(&out).unwrap();
    let rows = position_summary(&cases, Axis::X);
    let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(rows[0].position, 100.0);
}
