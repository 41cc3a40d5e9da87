//! Per-file artifacts: `results.json`, `input_data.json`, `raw_data.txt`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::result::{AnalysisResult, ResultRecord};
use crate::data::model::{RawData, Table};
use crate::error::PersistError;

pub const RESULTS_FILE: &str = "results.json";
pub const INPUT_DATA_FILE: &str = "input_data.json";
pub const RAW_COPY_FILE: &str = "raw_data.txt";

// ---------------------------------------------------------------------------
// input_data.json shape
// ---------------------------------------------------------------------------

/// Column/row ("split") layout of the parsed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitTable {
    pub index: Vec<usize>,
    pub columns: Vec<String>,
    /// Non-finite cells are written as `null` and read back as `NaN`.
    pub data: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDataRecord {
    /// Non-finite values are written as `null` and read back as `NaN`.
    pub metadata: BTreeMap<String, Option<f64>>,
    pub filepath: String,
    pub dataframe: SplitTable,
}

impl From<&RawData> for InputDataRecord {
    fn from(raw: &RawData) -> Self {
        Self {
            metadata: raw
                .metadata
                .iter()
                .map(|(key, &v)| (key.clone(), v.is_finite().then_some(v)))
                .collect(),
            filepath: raw.source_path.to_string_lossy().into_owned(),
            dataframe: SplitTable {
                index: (0..raw.table.len()).collect(),
                columns: raw.table.columns.clone(),
                data: raw
                    .table
                    .rows
                    .iter()
                    .map(|row| row.iter().map(|&v| v.is_finite().then_some(v)).collect())
                    .collect(),
            },
        }
    }
}

impl From<InputDataRecord> for RawData {
    fn from(rec: InputDataRecord) -> Self {
        let rows = rec
            .dataframe
            .data
            .into_iter()
            .map(|row| row.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();
        RawData {
            table: Table::new(rec.dataframe.columns, rows),
            metadata: rec
                .metadata
                .into_iter()
                .map(|(key, v)| (key, v.unwrap_or(f64::NAN)))
                .collect(),
            source_path: PathBuf::from(rec.filepath),
        }
    }
}

// ---------------------------------------------------------------------------
// Save / load
// ---------------------------------------------------------------------------

/// Paths written by [`save`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedArtifacts {
    pub results: PathBuf,
    pub input_data: PathBuf,
    pub raw_copy: PathBuf,
}

/// Write the result, the parsed input and a verbatim copy of the source
/// into `dest`, creating it (and its parents) first.
pub fn save(
    result: &AnalysisResult,
    raw: &RawData,
    dest: &Path,
) -> Result<SavedArtifacts, PersistError> {
    std::fs::create_dir_all(dest).map_err(|source| PersistError::CreateDir {
        path: dest.to_path_buf(),
        source,
    })?;

    let results = dest.join(RESULTS_FILE);
    write_json(&results, &ResultRecord::from(result))?;
    log::info!("Saved: {}", results.display());

    let input_data = dest.join(INPUT_DATA_FILE);
    write_json(&input_data, &InputDataRecord::from(raw))?;
    log::info!("Saved input data: {}", input_data.display());

    let raw_copy = dest.join(RAW_COPY_FILE);
    std::fs::copy(&raw.source_path, &raw_copy).map_err(|source| PersistError::Copy {
        from: raw.source_path.clone(),
        to: raw_copy.clone(),
        source,
    })?;

    Ok(SavedArtifacts {
        results,
        input_data,
        raw_copy,
    })
}

/// Read a `results.json` written by [`save`] (or by older tooling).
pub fn load_result(path: &Path) -> Result<AnalysisResult, PersistError> {
    let record: ResultRecord = read_json(path)?;
    Ok(record.into())
}

/// Rebuild [`RawData`] from an `input_data.json`.
pub fn load_input_data(path: &Path) -> Result<RawData, PersistError> {
    let record: InputDataRecord = read_json(path)?;
    if let Some(bad) = record
        .dataframe
        .data
        .iter()
        .position(|row| row.len() != record.dataframe.columns.len())
    {
        return Err(PersistError::Invalid {
            path: path.to_path_buf(),
            reason: format!("row {bad} does not match the column count"),
        });
    }
    Ok(record.into())
}

/// Remove the named artifacts from `dest`, then `dest` itself if it is left
/// empty. Files that do not exist are skipped. Returns how many were removed.
pub fn discard(dest: &Path, files: &[&str]) -> Result<usize, PersistError> {
    let mut removed = 0;
    for name in files {
        let path = dest.join(name);
        if !path.is_file() {
            continue;
        }
        std::fs::remove_file(&path).map_err(|source| PersistError::Remove {
            path: path.clone(),
            source,
        })?;
        log::info!("Removed stale: {}", path.display());
        removed += 1;
    }
    // Left in place when other files remain.
    if std::fs::remove_dir(dest).is_ok() {
        log::debug!("Removed empty case directory {}", dest.display());
    }
    Ok(removed)
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PersistError> {
    let text = std::fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| PersistError::Json {
        path: path.to_path_buf(),
        source,
    })
}
