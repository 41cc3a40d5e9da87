use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use twa_analyzer::app::GuiRunner;
use twa_analyzer::batch::{run_batch, BatchReport, FullRangeRunner, SessionRunner};
use twa_analyzer::config::AppConfig;
use twa_analyzer::data::discovery::{clean_user_path, discover_inputs};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e:#}");
    }
}

fn run() -> Result<()> {
    let config = AppConfig::discover().context("loading configuration")?;

    println!("==========================================");
    println!("   TWA Analyzer");
    println!("==========================================");

    let Some(input) = ask_input_path(&config)? else {
        println!("No input selected.");
        return Ok(());
    };
    let output_root = ask_output_dir(&config)?;

    let inputs = discover_inputs(&input, &config.paths.target_ext)?;
    if inputs.is_empty() {
        println!(
            "No .{} files found in {}",
            config.paths.target_ext,
            input.display()
        );
        return Ok(());
    }
    println!("{} file(s) to process", inputs.len());

    let mut runner: Box<dyn SessionRunner> = if config.analysis.interactive {
        Box::new(GuiRunner)
    } else {
        Box::new(FullRangeRunner)
    };
    let report = run_batch(&inputs, &output_root, &config, runner.as_mut());
    print_report(&report, &output_root);
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Typed path, or a native file/folder dialog when left empty.
fn ask_input_path(config: &AppConfig) -> Result<Option<PathBuf>> {
    let typed = prompt("Input file or folder (empty opens a dialog) > ")?;
    if !typed.is_empty() {
        return Ok(Some(clean_user_path(&typed)));
    }

    let start = if config.paths.input_dir.is_dir() {
        config.paths.input_dir.clone()
    } else {
        PathBuf::from(".")
    };
    let folder = prompt("Pick a [f]older or a single file? [f/F=folder, other=file] > ")?;
    let picked = if folder.eq_ignore_ascii_case("f") {
        rfd::FileDialog::new().set_directory(&start).pick_folder()
    } else {
        rfd::FileDialog::new()
            .set_directory(&start)
            .add_filter("TWA data", &[config.paths.target_ext.as_str()])
            .add_filter("All files", &["*"])
            .pick_file()
    };
    Ok(picked)
}

fn ask_output_dir(config: &AppConfig) -> Result<PathBuf> {
    let typed = prompt(&format!(
        "Output folder (default: {}) > ",
        config.paths.output_dir.display()
    ))?;
    Ok(if typed.is_empty() {
        config.paths.output_dir.clone()
    } else {
        clean_user_path(&typed)
    })
}

fn print_report(report: &BatchReport, output_root: &std::path::Path) {
    println!();
    println!("=== Done: {} file(s) ===", report.total());
    println!("  saved        : {}", report.saved.len());
    println!("  insufficient : {}", report.insufficient.len());
    println!("  failed       : {}", report.failed.len());
    for (path, reason) in &report.failed {
        println!("    {} : {reason}", path.display());
    }
    println!("Results under {}", output_root.display());
}
