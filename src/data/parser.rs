use std::collections::BTreeMap;
use std::path::Path;

use crate::config::AppConfig;
use crate::error::ParseError;

use super::model::{RawData, Table};

/// Line marker separating the measurement table from the metadata block.
pub const SAMPLE_INFO_MARKER: &str = "sample information";

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an instrument text file with the default column layout and the
/// given field separator.
pub fn parse(path: &Path, separator: char) -> Result<RawData, ParseError> {
    let mut config = AppConfig::default();
    config.columns.separator = separator;
    parse_with_config(path, &config)
}

/// Parse an instrument text file.
///
/// Layout:
/// ```text
/// prefix_freq<TAB>prefix_sqrt_TW_freq<TAB>prefix_amp<TAB>prefix_theta
/// 1.0<TAB>1.0<TAB>0.51<TAB>-0.42
/// ...
/// ---- sample information ----
/// 試料厚<TAB>26.5
/// x_pos<TAB>120
/// ```
pub fn parse_with_config(path: &Path, config: &AppConfig) -> Result<RawData, ParseError> {
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| ParseError::Encoding {
        path: path.to_path_buf(),
    })?;
    parse_text(&text, path, config)
}

/// Parse already-decoded file contents. `path` is only recorded, not read.
pub fn parse_text(text: &str, path: &Path, config: &AppConfig) -> Result<RawData, ParseError> {
    let separator = config.columns.separator;
    if !separator.is_ascii() {
        return Err(ParseError::InvalidSeparator(separator));
    }

    let lines: Vec<&str> = text.lines().collect();
    let marker = lines.iter().position(|l| l.contains(SAMPLE_INFO_MARKER));
    let (table_lines, meta_lines) = match marker {
        Some(i) => (&lines[..i], &lines[i + 1..]),
        None => (&lines[..], &lines[..0]),
    };

    let mut table = parse_table(table_lines, separator as u8, path)?;

    if let Some(idx) = table.column_index(&config.columns.phase) {
        let mut phase = table.rows.iter().map(|row| row[idx]).collect::<Vec<_>>();
        unwrap_phase(
            &mut phase,
            config.analysis.phase_period,
            config.analysis.phase_jump_threshold,
        );
        table.set_column(idx, &phase);
    }

    let metadata = parse_metadata(meta_lines, separator);
    log::debug!(
        "Parsed {}: {} rows, columns {:?}, {} metadata entries",
        path.display(),
        table.len(),
        table.columns,
        metadata.len()
    );

    Ok(RawData {
        table,
        metadata,
        source_path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Table section
// ---------------------------------------------------------------------------

fn parse_table(lines: &[&str], delimiter: u8, path: &Path) -> Result<Table, ParseError> {
    let body: String = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .flat_map(|l| [*l, "\n"])
        .collect();
    if body.is_empty() {
        return Err(ParseError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| ParseError::Table {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::MissingHeader {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| ParseError::Table {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(
            record
                .iter()
                .take(headers.len())
                .map(|cell| cell.trim().parse::<f64>().unwrap_or(f64::NAN))
                .collect(),
        );
    }

    Ok(Table::new(strip_common_prefix(headers), rows))
}

/// Remove an instrument-generated prefix shared by every header, e.g.
/// `sample01_freq`, `sample01_amp` → `freq`, `amp`.
pub fn strip_common_prefix(headers: Vec<String>) -> Vec<String> {
    if headers.len() < 2 {
        return headers;
    }
    let prefix = common_prefix(&headers);
    let shortest = headers.iter().map(|h| h.chars().count()).min().unwrap_or(0);
    if prefix.is_empty() || prefix.chars().count() >= shortest {
        return headers;
    }
    headers
        .into_iter()
        .map(|h| match h.strip_prefix(prefix.as_str()) {
            Some(rest) => rest.to_string(),
            None => h,
        })
        .collect()
}

fn common_prefix(items: &[String]) -> String {
    let Some(first) = items.first() else {
        return String::new();
    };
    let mut len = first.len();
    for other in &items[1..] {
        len = first
            .char_indices()
            .zip(other.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    first[..len].to_string()
}

// ---------------------------------------------------------------------------
// Metadata section
// ---------------------------------------------------------------------------

fn parse_metadata(lines: &[&str], separator: char) -> BTreeMap<String, f64> {
    let mut metadata = BTreeMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts: Vec<&str> = line.split(separator).collect();
        if parts.len() < 2 {
            parts = match line.split_once(char::is_whitespace) {
                Some((key, value)) => vec![key, value],
                None => continue,
            };
        }
        let key = parts[0].trim();
        if let Ok(value) = parts[1].trim().parse::<f64>() {
            metadata.insert(key.to_string(), value);
        }
    }
    metadata
}

// ---------------------------------------------------------------------------
// Phase unwrap
// ---------------------------------------------------------------------------

/// Remove instrument wrap-around from a phase trace, in place.
///
/// Only jumps with `|Δ| > threshold` are corrected, by `round(Δ / period)`
/// whole periods (ties to even). The correction accumulates and applies to
/// every later sample; sample 0 is never touched.
pub fn unwrap_phase(phase: &mut [f64], period: f64, threshold: f64) {
    let diffs: Vec<f64> = phase.windows(2).map(|w| w[1] - w[0]).collect();
    let mut cumulative = 0.0;
    for (i, d) in diffs.into_iter().enumerate() {
        let k = if d.abs() > threshold {
            (d / period).round_ties_even()
        } else {
            0.0
        };
        cumulative += -k * period;
        phase[i + 1] += cumulative;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn unwrap_fixture() {
        let mut p = vec![0.1, 0.2, 3.4, 3.5, 0.3, -3.0];
        unwrap_phase(&mut p, PI, 3.0);
        assert_eq!(p[0], 0.1);
        assert_eq!(p[1], 0.2);
        assert!((p[2] - (3.4 - PI)).abs() < 1e-12);
        assert!((p[3] - (3.5 - PI)).abs() < 1e-12);
        assert!((p[4] - 0.3).abs() < 1e-12);
        assert!((p[5] - (-3.0 + PI)).abs() < 1e-12);
    }

    #[test]
    fn unwrap_leaves_continuous_data_alone() {
        let original = vec![0.0, -0.5, -1.4, -2.9, -5.5, -8.4];
        let mut p = original.clone();
        unwrap_phase(&mut p, PI, 3.0);
        assert_eq!(p, original);
    }

    #[test]
    fn unwrap_ignores_jumps_between_half_period_and_threshold() {
        // 2.0 > π/2 but below the 3.0 threshold: treated as physical.
        let mut p = vec![0.0, 2.0, 4.0];
        unwrap_phase(&mut p, PI, 3.0);
        assert_eq!(p, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn unwrap_handles_short_input() {
        let mut empty: Vec<f64> = vec![];
        unwrap_phase(&mut empty, PI, 3.0);
        let mut one = vec![1.0];
        unwrap_phase(&mut one, PI, 3.0);
        assert_eq!(one, vec![1.0]);
    }

    #[test]
    fn prefix_is_removed_once() {
        let headers = vec!["run_freq".to_string(), "run_amp".to_string(), "run_theta".to_string()];
        assert_eq!(strip_common_prefix(headers), vec!["freq", "amp", "theta"]);
    }

    #[test]
    fn prefix_equal_to_a_header_is_kept() {
        let headers = vec!["amp".to_string(), "amp_sigma".to_string()];
        assert_eq!(strip_common_prefix(headers.clone()), headers);
    }

    #[test]
    fn single_column_is_untouched() {
        let headers = vec!["run_freq".to_string()];
        assert_eq!(strip_common_prefix(headers.clone()), headers);
    }

    #[test]
    fn metadata_falls_back_to_whitespace() {
        let meta = parse_metadata(&["thickness   26.5", "label\tnot-a-number", "", "x_pos\t10"], '\t');
        assert_eq!(meta.get("thickness"), Some(&26.5));
        assert_eq!(meta.get("x_pos"), Some(&10.0));
        assert!(!meta.contains_key("label"));
    }

    #[test]
    fn text_without_marker_has_no_metadata() {
        let cfg = AppConfig::default();
        let raw = parse_text("freq\tamp\n1\t2\n3\t4\n", Path::new("x.txt"), &cfg).unwrap();
        assert_eq!(raw.table.columns, vec!["freq", "amp"]);
        assert_eq!(raw.table.len(), 2);
        assert!(raw.metadata.is_empty());
    }

    #[test]
    fn empty_text_is_missing_header() {
        let cfg = AppConfig::default();
        let err = parse_text("\n\n", Path::new("x.txt"), &cfg).unwrap_err();
        assert!(matches!(err, ParseError::MissingHeader { .. }));
    }

    #[test]
    fn non_ascii_separator_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.columns.separator = '、';
        let err = parse_text("a、b\n", Path::new("x.txt"), &cfg).unwrap_err();
        assert!(matches!(err, ParseError::InvalidSeparator('、')));
    }
}
