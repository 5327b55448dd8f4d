//! `sheetpilot-store` persists [`sheetpilot_model::Table`]s inside multi-sheet workbook files.
//!
//! Reads are lock-free; every write is a full read-modify-write of the document held under a
//! per-path exclusive lock and finished with an atomic rename, so concurrent edits of one file
//! serialize while readers only ever observe complete files.

mod error;
mod lock;
mod store;
mod xlsx;

pub use error::{Result, StoreError};
pub use lock::PathLease;
pub use store::{DocumentStore, SheetSummary, WorkbookSummary, DEFAULT_LOCK_TIMEOUT};
