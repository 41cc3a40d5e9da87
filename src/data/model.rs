use std::collections::BTreeMap;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Table – the measurement section of an instrument file
// ---------------------------------------------------------------------------

/// Row-major numeric table. Cells that were empty or non-numeric hold `NaN`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Ordered column names (trimmed, instrument prefix removed).
    pub columns: Vec<String>,
    /// Each row has exactly `columns.len()` values.
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, f64::NAN);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Copy of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// One row as column name → value.
    pub fn row(&self, index: usize) -> Option<BTreeMap<&str, f64>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .map(String::as_str)
                .zip(row.iter().copied())
                .collect(),
        )
    }

    /// Overwrite a column in place. `values` must match the row count.
    pub(crate) fn set_column(&mut self, idx: usize, values: &[f64]) {
        for (row, &v) in self.rows.iter_mut().zip(values) {
            row[idx] = v;
        }
    }
}

// ---------------------------------------------------------------------------
// RawData – one parsed measurement file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RawData {
    pub table: Table,
    /// Numeric entries of the "sample information" section.
    pub metadata: BTreeMap<String, f64>,
    pub source_path: PathBuf,
}

impl RawData {
    /// File stem of the source, used as the per-file output directory name.
    pub fn case_name(&self) -> String {
        self.source_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0], vec![3.0]],
        )
    }

    #[test]
    fn short_rows_are_padded_with_nan() {
        let t = table();
        assert_eq!(t.len(), 2);
        assert!(t.rows[1][1].is_nan());
    }

    #[test]
    fn column_and_row_access() {
        let t = table();
        assert_eq!(t.column("a"), Some(vec![1.0, 3.0]));
        assert_eq!(t.column("zzz"), None);
        let row = t.row(0).unwrap();
        assert_eq!(row["b"], 2.0);
        assert!(t.row(5).is_none());
    }

    #[test]
    fn case_name_is_file_stem() {
        let raw = RawData {
            table: Table::default(),
            metadata: BTreeMap::new(),
            source_path: PathBuf::from("/tmp/run_01.txt"),
        };
        assert_eq!(raw.case_name(), "run_01");
    }
}
