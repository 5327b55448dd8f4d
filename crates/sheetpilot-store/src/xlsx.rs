//! Workbook file round trip.
//!
//! Reading goes through `calamine` (any format it auto-detects); writing produces `.xlsx`
//! via `rust_xlsxwriter`. Sheets are carried as raw cell grids so sheets that are not being
//! edited are written back exactly where they were, dates included. The raw header row is
//! kept as read; normalized column names only exist on the [`Table`] side.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use sheetpilot_model::{CellValue, Table};

use crate::error::{Result, StoreError};

/// A grid cell: a table value, or an Excel serial date-time that keeps its date formatting.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum GridCell {
    Value(CellValue),
    DateTime(f64),
}

impl GridCell {
    fn to_value(&self) -> CellValue {
        match self {
            GridCell::Value(value) => value.clone(),
            GridCell::DateTime(serial) => CellValue::Number(*serial),
        }
    }
}

impl From<CellValue> for GridCell {
    fn from(value: CellValue) -> Self {
        GridCell::Value(value)
    }
}

/// One sheet as a rectangular block of cells anchored at `origin` (row, col).
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SheetGrid {
    pub(crate) name: String,
    pub(crate) origin: (u32, u16),
    pub(crate) rows: Vec<Vec<GridCell>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct WorkbookGrid {
    pub(crate) sheets: Vec<SheetGrid>,
}

impl WorkbookGrid {
    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub(crate) fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Replace the body of `name` with `table`, or append it as a new sheet written from A1.
    pub(crate) fn replace_sheet(&mut self, name: &str, table: &Table) {
        match self.sheets.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.replace_body(table),
            None => self.sheets.push(SheetGrid::from_table(name, table)),
        }
    }
}

fn data_to_cell(cell: &Data) -> GridCell {
    let value = match cell {
        Data::Empty => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => return GridCell::DateTime(dt.as_f64()),
        other => CellValue::Text(other.to_string()),
    };
    GridCell::Value(value)
}

pub(crate) fn read_workbook(path: &Path) -> Result<WorkbookGrid> {
    let read_err = |source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut workbook = open_workbook_auto(path).map_err(read_err)?;
    let mut out = WorkbookGrid::default();

    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name).map_err(read_err)?;
        let (row, col) = range.start().unwrap_or((0, 0));
        let rows = range
            .rows()
            .map(|cells| cells.iter().map(data_to_cell).collect())
            .collect();
        out.sheets.push(SheetGrid {
            name,
            origin: (row, u16::try_from(col).unwrap_or(u16::MAX)),
            rows,
        });
    }

    Ok(out)
}

fn date_format(serial: f64) -> Format {
    if serial.fract() == 0.0 {
        Format::new().set_num_format("yyyy-mm-dd")
    } else {
        Format::new().set_num_format("yyyy-mm-dd hh:mm:ss")
    }
}

/// Serialize the whole workbook to `.xlsx` bytes.
pub(crate) fn write_workbook_bytes(workbook: &WorkbookGrid) -> Result<Vec<u8>> {
    let mut out = XlsxWorkbook::new();

    for sheet in &workbook.sheets {
        let worksheet = out.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        let (row0, col0) = sheet.origin;
        for (r, cells) in sheet.rows.iter().enumerate() {
            let row = row0 + r as u32;
            for (c, cell) in cells.iter().enumerate() {
                let col = col0 + c as u16;
                match cell {
                    GridCell::Value(CellValue::Null) => {}
                    GridCell::Value(CellValue::Number(n)) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                    GridCell::Value(CellValue::Text(s)) => {
                        worksheet.write_string(row, col, s)?;
                    }
                    GridCell::Value(CellValue::Bool(b)) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                    GridCell::DateTime(serial) => {
                        let format = date_format(*serial);
                        worksheet.write_number_with_format(row, col, *serial, &format)?;
                    }
                }
            }
        }
    }

    Ok(out.save_to_buffer()?)
}

/// Only `.xlsx` can be rewritten; saving `.xlsm` through the writer would drop its macros.
pub(crate) fn ensure_writable_format(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match extension.as_deref() {
        Some("xlsx") => Ok(()),
        _ => Err(StoreError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn header_name(cell: &GridCell, index: usize) -> String {
    match cell.to_value() {
        CellValue::Null => format!("Unnamed: {index}"),
        CellValue::Text(s) if s.is_empty() => format!("Unnamed: {index}"),
        other => other.to_string(),
    }
}

/// Make header names unique the way dataframe readers do: `Name`, `Name.1`, `Name.2`, ...
fn dedupe_headers(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        if !out.contains(&name) {
            out.push(name);
            continue;
        }
        let mut suffix = 1;
        loop {
            let candidate = format!("{name}.{suffix}");
            if !out.contains(&candidate) {
                out.push(candidate);
                break;
            }
            suffix += 1;
        }
    }
    out
}

impl SheetGrid {
    /// Column names as the [`Table`] sees them.
    fn columns(&self) -> Vec<String> {
        let Some(header) = self.rows.first() else {
            return Vec::new();
        };
        dedupe_headers(
            header
                .iter()
                .enumerate()
                .map(|(i, cell)| header_name(cell, i))
                .collect(),
        )
    }

    /// Interpret the first grid row as the header and the rest as data rows.
    pub(crate) fn to_table(&self) -> Result<Table> {
        let columns = self.columns();
        let width = columns.len();
        let rows = self
            .rows
            .iter()
            .skip(1)
            .map(|cells| {
                let mut row: Vec<CellValue> = cells.iter().map(GridCell::to_value).collect();
                row.resize(width, CellValue::Null);
                row
            })
            .collect();

        Ok(Table::new(columns, rows)?)
    }

    pub(crate) fn from_table(name: &str, table: &Table) -> Self {
        let mut grid = Self {
            name: name.to_string(),
            origin: (0, 0),
            rows: Vec::new(),
        };
        grid.replace_body(table);
        grid
    }

    /// Columns whose body holds dates and no plain numbers.
    fn date_columns(&self) -> Vec<bool> {
        let mut dates = Vec::new();
        let mut numbers = Vec::new();
        for cells in self.rows.iter().skip(1) {
            for (c, cell) in cells.iter().enumerate() {
                if dates.len() <= c {
                    dates.resize(c + 1, false);
                    numbers.resize(c + 1, false);
                }
                match cell {
                    GridCell::DateTime(_) => dates[c] = true,
                    GridCell::Value(CellValue::Number(_)) => numbers[c] = true,
                    GridCell::Value(_) => {}
                }
            }
        }
        dates.iter().zip(&numbers).map(|(d, n)| *d && !n).collect()
    }

    /// Rewrite the data rows from `table`, in place.
    ///
    /// The header row is kept byte-for-byte when it still names the table's columns and is
    /// rebuilt from the column names otherwise. Numbers landing in a date column are written
    /// as dates.
    fn replace_body(&mut self, table: &Table) {
        let header: Vec<GridCell> = match self.rows.first() {
            Some(raw) if self.columns() == table.columns() => raw.clone(),
            _ => table
                .columns()
                .iter()
                .map(|c| GridCell::Value(CellValue::Text(c.clone())))
                .collect(),
        };
        let date_columns = self.date_columns();

        let mut rows = Vec::with_capacity(table.row_count() + 1);
        if !header.is_empty() {
            rows.push(header);
        }
        rows.extend(table.rows().iter().map(|values| {
            values
                .iter()
                .enumerate()
                .map(|(c, value)| match value {
                    CellValue::Number(n) if date_columns.get(c).copied().unwrap_or(false) => {
                        GridCell::DateTime(*n)
                    }
                    other => GridCell::Value(other.clone()),
                })
                .collect()
        }));
        self.rows = rows;
    }
}
