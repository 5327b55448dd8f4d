//! Structured mutations for callers that already know what to change.
//!
//! No text extraction and no permission check happen here; the calling surface is expected to
//! gate requests itself before reaching this API.

use std::path::Path;

use serde::Serialize;
use sheetpilot_model::{mutation, CellValue, Mutation, RowData};
use sheetpilot_store::DocumentStore;

use crate::error::ActionError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DirectResult {
    pub success: bool,
    pub error: Option<String>,
}

impl From<Result<(), ActionError>> for DirectResult {
    fn from(result: Result<(), ActionError>) -> Self {
        match result {
            Ok(()) => DirectResult {
                success: true,
                error: None,
            },
            Err(err) => DirectResult {
                success: false,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Applies structured mutations through a [`DocumentStore`].
///
/// `DirectApi::default()` owns a fresh store with the default lock timeout. To share the
/// in-process lock table with a [`Dispatcher`](crate::Dispatcher), pass the same store to
/// [`DirectApi::new`] and [`Dispatcher::with_store`](crate::Dispatcher::with_store).
#[derive(Clone, Debug, Default)]
pub struct DirectApi {
    store: DocumentStore,
}

impl DirectApi {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    pub fn update_cell(
        &self,
        path: &Path,
        sheet: Option<&str>,
        row: usize,
        column: &str,
        value: impl Into<CellValue>,
    ) -> DirectResult {
        self.run(
            path,
            sheet,
            Mutation::UpdateCell {
                row,
                column: column.to_string(),
                value: value.into(),
            },
        )
    }

    pub fn add_row(&self, path: &Path, sheet: Option<&str>, data: RowData) -> DirectResult {
        self.run(path, sheet, Mutation::AddRow { data })
    }

    pub fn delete_row(&self, path: &Path, sheet: Option<&str>, row: usize) -> DirectResult {
        self.run(path, sheet, Mutation::DeleteRow { row })
    }

    fn run(&self, path: &Path, sheet: Option<&str>, op: Mutation) -> DirectResult {
        let result = self
            .store
            .mutate(path, sheet, |table| {
                mutation::apply(table, &op).map_err(ActionError::from)
            })
            .map(|_| ());
        match &result {
            Ok(()) => log::info!("{}: {}", path.display(), op.describe()),
            Err(err) => log::warn!("{}: {} failed: {err}", path.display(), op.kind()),
        }
        result.into()
    }
}
