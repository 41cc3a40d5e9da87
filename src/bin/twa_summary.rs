//! Aggregate saved `results.json` files into position and thickness summaries.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

use twa_analyzer::config::AppConfig;
use twa_analyzer::data::discovery::clean_user_path;
use twa_analyzer::summary::{
    collect_results, position_summary, thickness_summary, write_position_summary,
    write_thickness_summary, Axis,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{e:#}");
    }
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn run() -> Result<()> {
    let config = AppConfig::discover().context("loading configuration")?;

    println!("==========================================");
    println!("   TWA Analyzer : Summary Mode");
    println!("==========================================");

    let typed = prompt(&format!(
        "Results folder (default: {}) > ",
        config.paths.output_dir.display()
    ))?;
    let root = if typed.is_empty() {
        config.paths.output_dir.clone()
    } else {
        clean_user_path(&typed)
    };
    let axis_text = prompt("Axis [x/y/z] (default: x) > ")?;
    let axis: Axis = if axis_text.is_empty() {
        Axis::X
    } else {
        axis_text.parse()?
    };

    let cases = collect_results(&root)?;
    if cases.is_empty() {
        println!("No results.json found under {}", root.display());
        return Ok(());
    }

    let positions = position_summary(&cases, axis);
    if positions.is_empty() {
        println!("No result has both a {}-position and a phase diffusivity.", axis.short());
    } else {
        println!("{} row(s) in the position summary", positions.len());
        for path in write_position_summary(&root, &positions, axis, &config.plot)? {
            println!("Saved: {}", path.display());
        }
    }

    let thickness = thickness_summary(&cases, axis);
    if thickness.is_empty() {
        println!("No result has a {}-position.", axis.short());
    } else {
        for path in write_thickness_summary(&root, &thickness, axis, &config.plot)? {
            println!("Saved: {}", path.display());
        }
    }

    println!("=== Summary complete ===");
    Ok(())
}
