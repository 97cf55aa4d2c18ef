//! In-memory tabular dataset.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// An ordered set of named columns with string cells.
///
/// Rows may be shorter than the header list; a missing trailing cell reads
/// as absent. Rows wider than the header list are rejected on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Build a dataset, checking that column names are unique and that no
    /// row carries more cells than there are columns.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for header in &headers {
            if !seen.insert(header.as_str()) {
                return Err(ModelError::DuplicateColumn(header.clone()));
            }
        }
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() > headers.len())
        {
            return Err(ModelError::RowTooWide {
                headers: headers.len(),
                row,
                cells: cells.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Cell at `(row, column)`, or `None` when the row is short or out of range.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
    }

    /// Every cell of a column in row order, absent cells included as `None`.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&str>> + '_ {
        self.rows
            .iter()
            .map(move |cells| cells.get(column).map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    #[test]
    fn ragged_rows_read_as_absent() {
        let dataset = Dataset::new(
            strings(&["a", "b"]),
            vec![strings(&["1", "2"]), strings(&["3"])],
        )
        .expect("valid dataset");

        assert_eq!(dataset.cell(0, 1), Some("2"));
        assert_eq!(dataset.cell(1, 1), None);
        assert_eq!(dataset.cell(5, 0), None);
        let column: Vec<_> = dataset.column_values(1).collect();
        assert_eq!(column, vec![Some("2"), None]);
    }

    #[test]
    fn rejects_wide_rows() {
        let err = Dataset::new(strings(&["a"]), vec![strings(&["1", "2"])]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::RowTooWide {
                headers: 1,
                row: 0,
                cells: 2
            }
        ));
    }

    #[test]
    fn rejects_duplicate_headers() {
        let err = Dataset::new(strings(&["a", "a"]), vec![]).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateColumn(name) if name == "a"));
    }

    #[test]
    fn column_lookup() {
        let dataset = Dataset::new(strings(&["id", "name"]), vec![]).expect("valid dataset");
        assert_eq!(dataset.column_index("name"), Some(1));
        assert_eq!(dataset.column_index("missing"), None);
        assert!(dataset.is_empty());
    }
}
