//! `sheetpilot-model` defines the in-memory table, the permission gate and the pure mutation
//! engine shared by the document store and the action dispatcher.
//!
//! Nothing in this crate touches the filesystem; it is safe to call from any thread.

mod intent;
pub mod mutation;
pub mod permission;
mod sheet_name;
mod table;
mod value;

pub use intent::{Mutation, MutationIntent, MutationKind, RowData};
pub use mutation::MutationError;
pub use permission::{
    allows, check, Capability, ParsePermissionModeError, PermissionDenied, PermissionMode,
};
pub use sheet_name::{resolve_sheet_name, sheet_name_eq_case_insensitive};
pub use table::{RowMap, Table, TableError};
pub use value::CellValue;
