use std::path::PathBuf;
use std::time::Duration;

use sheetpilot_model::TableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("sheet not found: {sheet}")]
    SheetNotFound { sheet: String },
    #[error("timed out after {waited:?} waiting for another edit of {}", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },
    #[error("unsupported workbook format for writing: {} (only .xlsx is supported)", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("failed to read workbook {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("failed to serialize workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
    #[error("invalid table: {0}")]
    Table(#[from] TableError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether repeating the same request later might succeed.
    ///
    /// Lock timeouts and filesystem errors are transient; missing files/sheets and format
    /// problems are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::LockTimeout { .. } | StoreError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
