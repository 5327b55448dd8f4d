//! Pure table mutations.
//!
//! Every operation takes the current table by reference and returns a new one, so a failed
//! mutation never leaves a half-applied table behind. None of these functions know about
//! files, locks or permissions.
//!
//! Row identity is positional: after `delete_row(t, i)` the row previously at `i + 1` is at
//! `i`. A batch of intents whose indices were computed against the original table will hit
//! different rows once an earlier delete has been applied.

use thiserror::Error;

use crate::{CellValue, Mutation, RowData, Table};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("row {} does not exist (table has {len} rows)", .row.saturating_add(1))]
    RowOutOfRange { row: usize, len: usize },
    #[error("column '{column}' does not exist")]
    ColumnNotFound { column: String },
    #[error("column '{column}' does not exist in the table")]
    UnknownColumn { column: String },
}

fn check_row(table: &Table, row: usize) -> Result<(), MutationError> {
    if row < table.row_count() {
        Ok(())
    } else {
        Err(MutationError::RowOutOfRange {
            row,
            len: table.row_count(),
        })
    }
}

/// Replace the value at (`row`, `column`); every other cell is unchanged.
pub fn update_cell(
    table: &Table,
    row: usize,
    column: &str,
    value: CellValue,
) -> Result<Table, MutationError> {
    check_row(table, row)?;
    let col = table
        .column_index(column)
        .ok_or_else(|| MutationError::ColumnNotFound {
            column: column.to_string(),
        })?;

    let mut out = table.clone();
    out.set_cell(row, col, value);
    Ok(out)
}

/// Append a row built from `data`; columns missing from `data` are null.
///
/// Fails on the first key (in `data` order) that is not a table column.
pub fn add_row(table: &Table, data: &RowData) -> Result<Table, MutationError> {
    if let Some(unknown) = data.keys().find(|key| table.column_index(key).is_none()) {
        return Err(MutationError::UnknownColumn {
            column: unknown.clone(),
        });
    }

    let values = table
        .columns()
        .iter()
        .map(|column| data.get(column).cloned().unwrap_or_default())
        .collect();

    let mut out = table.clone();
    out.push_row(values);
    Ok(out)
}

/// Remove the row at `row`; later rows shift up by one.
pub fn delete_row(table: &Table, row: usize) -> Result<Table, MutationError> {
    check_row(table, row)?;
    let mut out = table.clone();
    out.remove_row(row);
    Ok(out)
}

/// Apply any [`Mutation`] and return the new table.
pub fn apply(table: &Table, mutation: &Mutation) -> Result<Table, MutationError> {
    match mutation {
        Mutation::UpdateCell { row, column, value } => {
            update_cell(table, *row, column, value.clone())
        }
        Mutation::AddRow { data } => add_row(table, data),
        Mutation::DeleteRow { row } => delete_row(table, *row),
    }
}
