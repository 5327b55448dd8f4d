use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::CellValue;

/// A row viewed as `column name -> value`, in column order.
pub type RowMap = IndexMap<String, CellValue>;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("row {row} has {actual} values but the table has {expected} columns")]
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// One sheet materialized as a rectangular table.
///
/// Each row is stored as a vector aligned with [`Table::columns`], so every row always has
/// exactly the table's columns in the same order. A row's position is its only identity.
///
/// Deserialization goes through [`Table::new`], so ragged or duplicate-column payloads are
/// rejected instead of producing a table that cannot be indexed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            columns: Vec<String>,
            #[serde(default)]
            rows: Vec<Vec<CellValue>>,
        }

        let helper = Helper::deserialize(deserializer)?;
        Table::new(helper.columns, helper.rows).map_err(serde::de::Error::custom)
    }
}

impl Table {
    /// Build a table, validating unique column names and row widths.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self, TableError> {
        for (idx, name) in columns.iter().enumerate() {
            if columns[..idx].contains(name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != columns.len() {
                return Err(TableError::RowWidthMismatch {
                    row,
                    expected: columns.len(),
                    actual: values.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Table with the given header and no rows.
    pub fn with_columns<I, S>(columns: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns.into_iter().map(Into::into).collect(), Vec::new())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `column` in the header, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn row(&self, row: usize) -> Option<&[CellValue]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[col])
    }

    /// Mapping view of one row (`column -> value`).
    pub fn row_map(&self, row: usize) -> Option<RowMap> {
        let values = self.rows.get(row)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(values.iter().cloned())
                .collect(),
        )
    }

    /// Rows as mappings, truncated to `limit` when given.
    pub fn records(&self, limit: Option<usize>) -> Vec<RowMap> {
        let take = limit.unwrap_or(self.rows.len()).min(self.rows.len());
        (0..take).filter_map(|row| self.row_map(row)).collect()
    }

    pub(crate) fn set_cell(&mut self, row: usize, col: usize, value: CellValue) {
        self.rows[row][col] = value;
    }

    pub(crate) fn push_row(&mut self, values: Vec<CellValue>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(values);
    }

    pub(crate) fn remove_row(&mut self, row: usize) -> Vec<CellValue> {
        self.rows.remove(row)
    }

    /// Decompose into `(columns, rows)`.
    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<CellValue>>) {
        (self.columns, self.rows)
    }
}
