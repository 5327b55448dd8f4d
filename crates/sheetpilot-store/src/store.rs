use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sheetpilot_model::{resolve_sheet_name, RowMap, Table};

use crate::error::{Result, StoreError};
use crate::lock::{LockTable, PathLease};
use crate::xlsx::{self, WorkbookGrid};

/// Default bounded wait for another in-flight edit of the same document.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Sheet-level overview returned by [`DocumentStore::workbook_summary`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub columns: Vec<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub sample: Vec<RowMap>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkbookSummary {
    pub sheet_names: Vec<String>,
    pub sheets: Vec<SheetSummary>,
}

/// Whole-document access to workbook files.
///
/// Every write rewrites the complete file: the workbook is re-read, the target sheet is
/// replaced, and the result is renamed over the original. Writers of the same path are
/// serialized through a per-path lock; readers never take it because the rename is atomic.
///
/// The lock holds across stores and processes: clones share one in-process lock table, and
/// every lease also holds an advisory lock on a sidecar file beside the document.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    locks: Arc<LockTable>,
    lock_timeout: Duration,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl DocumentStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            locks: Arc::new(LockTable::default()),
            lock_timeout,
        }
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Acquire the exclusive lease for `path`, waiting up to the configured timeout.
    pub fn lock(&self, path: &Path) -> Result<PathLease> {
        self.locks.acquire(path, self.lock_timeout)
    }

    /// Read one sheet as a [`Table`]. `sheet: None` selects the first sheet.
    pub fn load(&self, path: &Path, sheet: Option<&str>) -> Result<Table> {
        let workbook = read_existing(path)?;
        table_from(&workbook, sheet)
    }

    pub fn sheet_names(&self, path: &Path) -> Result<Vec<String>> {
        Ok(read_existing(path)?.sheet_names())
    }

    /// Replace one sheet with `table`, keeping every other sheet as it is on disk.
    ///
    /// A missing sheet is appended; a missing file is created.
    pub fn save(&self, path: &Path, sheet: Option<&str>, table: &Table) -> Result<()> {
        xlsx::ensure_writable_format(path)?;
        let _lease = self.lock(path)?;

        let mut workbook = if path.exists() {
            xlsx::read_workbook(path)?
        } else {
            WorkbookGrid::default()
        };
        let target = target_sheet_name(&workbook, sheet);
        write(path, &mut workbook, &target, table)
    }

    /// Run the load, mutate, save cycle for one sheet under the path lock.
    ///
    /// Nothing is written when `f` fails; its error is returned as-is.
    pub fn mutate<F, E>(
        &self,
        path: &Path,
        sheet: Option<&str>,
        f: F,
    ) -> std::result::Result<Table, E>
    where
        F: FnOnce(&Table) -> std::result::Result<Table, E>,
        E: From<StoreError>,
    {
        xlsx::ensure_writable_format(path)?;
        let _lease = self.lock(path)?;

        let mut workbook = read_existing(path)?;
        let table = table_from(&workbook, sheet)?;
        let target = target_sheet_name(&workbook, sheet);

        let updated = f(&table)?;
        write(path, &mut workbook, &target, &updated)?;
        Ok(updated)
    }

    /// Column names, row counts and the first `sample_rows` rows of every sheet.
    pub fn workbook_summary(&self, path: &Path, sample_rows: usize) -> Result<WorkbookSummary> {
        let workbook = read_existing(path)?;
        let mut sheets = Vec::with_capacity(workbook.sheets.len());
        for grid in &workbook.sheets {
            let table = grid.to_table()?;
            sheets.push(SheetSummary {
                name: grid.name.clone(),
                columns: table.columns().to_vec(),
                row_count: table.row_count(),
                column_count: table.column_count(),
                sample: table.records(Some(sample_rows)),
            });
        }
        Ok(WorkbookSummary {
            sheet_names: workbook.sheet_names(),
            sheets,
        })
    }
}

fn read_existing(path: &Path) -> Result<WorkbookGrid> {
    if !path.is_file() {
        return Err(StoreError::FileNotFound(path.to_path_buf()));
    }
    let workbook = xlsx::read_workbook(path)?;
    log::debug!("read {} ({} sheets)", path.display(), workbook.sheets.len());
    Ok(workbook)
}

fn table_from(workbook: &WorkbookGrid, sheet: Option<&str>) -> Result<Table> {
    let names = workbook.sheet_names();
    let name = resolve_sheet_name(&names, sheet).ok_or_else(|| StoreError::SheetNotFound {
        sheet: sheet.unwrap_or("<first sheet>").to_string(),
    })?;
    match workbook.sheet(name) {
        Some(grid) => grid.to_table(),
        None => Err(StoreError::SheetNotFound {
            sheet: name.to_string(),
        }),
    }
}

/// Name the written sheet will carry: the existing sheet it resolves to, the requested
/// name verbatim when it is new, or the first sheet / `Sheet1` when none was requested.
fn target_sheet_name(workbook: &WorkbookGrid, sheet: Option<&str>) -> String {
    let names = workbook.sheet_names();
    match resolve_sheet_name(&names, sheet) {
        Some(name) => name.to_string(),
        None => sheet.unwrap_or(DEFAULT_SHEET_NAME).to_string(),
    }
}

fn write(path: &Path, workbook: &mut WorkbookGrid, sheet: &str, table: &Table) -> Result<()> {
    workbook.replace_sheet(sheet, table);
    let bytes = xlsx::write_workbook_bytes(workbook)?;
    sheetpilot_fs::atomic_write_bytes(path, &bytes)?;
    log::debug!(
        "rewrote {} ({} bytes, sheet '{sheet}' has {} rows)",
        path.display(),
        bytes.len(),
        table.row_count()
    );
    Ok(())
}
