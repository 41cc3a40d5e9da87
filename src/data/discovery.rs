//! Input discovery: a single instrument file or every matching file in a directory.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Resolve a user-supplied path into the list of files to process.
///
/// A file is returned as-is; a directory yields its direct children with
/// the given extension (case-insensitive), sorted by file name.
pub fn discover_inputs(path: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("input not found: {}", path.display());
    }

    let mut files = Vec::new();
    let entries = std::fs::read_dir(path)
        .with_context(|| format!("reading directory {}", path.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading directory {}", path.display()))?;
        let candidate = entry.path();
        if !candidate.is_file() {
            continue;
        }
        let matches = candidate
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if matches {
            files.push(candidate);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Strip surrounding quotes and whitespace from a pasted or drag-and-dropped path.
pub fn clean_user_path(input: &str) -> PathBuf {
    PathBuf::from(input.trim().trim_matches('"').trim_matches('\''))
}
