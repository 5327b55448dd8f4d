use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CellValue, Capability};

/// Column values for a new row, in the order they were supplied.
pub type RowData = IndexMap<String, CellValue>;

/// One structured change to a table. Row indices are 0-based.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    UpdateCell {
        row: usize,
        column: String,
        value: CellValue,
    },
    AddRow {
        data: RowData,
    },
    DeleteRow {
        row: usize,
    },
}

/// Coarse mutation class, used for capability checks and outcome reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Update,
    Add,
    Delete,
}

impl MutationKind {
    /// Capability a document must grant before this kind of mutation is attempted.
    pub fn required_capability(self) -> Capability {
        match self {
            MutationKind::Update | MutationKind::Add => Capability::Write,
            MutationKind::Delete => Capability::Delete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Update => "update",
            MutationKind::Add => "add",
            MutationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::UpdateCell { .. } => MutationKind::Update,
            Mutation::AddRow { .. } => MutationKind::Add,
            Mutation::DeleteRow { .. } => MutationKind::Delete,
        }
    }

    /// Human-readable summary, with rows reported 1-based as users count them.
    pub fn describe(&self) -> String {
        match self {
            Mutation::UpdateCell { row, column, value } => {
                format!("Updated row {}, column '{column}' to '{value}'", row + 1)
            }
            Mutation::AddRow { data } => {
                let pairs: Vec<String> = data.iter().map(|(k, v)| format!("{k}='{v}'")).collect();
                format!("Added new row with {}", pairs.join(", "))
            }
            Mutation::DeleteRow { row } => format!("Deleted row {}", row + 1),
        }
    }
}

/// A [`Mutation`] aimed at a sheet of some document.
///
/// `sheet: None` targets the document's first sheet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MutationIntent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    #[serde(flatten)]
    pub mutation: Mutation,
}

impl MutationIntent {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            sheet: None,
            mutation,
        }
    }

    pub fn on_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn update_cell(row: usize, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self::new(Mutation::UpdateCell {
            row,
            column: column.into(),
            value: value.into(),
        })
    }

    pub fn add_row(data: RowData) -> Self {
        Self::new(Mutation::AddRow { data })
    }

    pub fn delete_row(row: usize) -> Self {
        Self::new(Mutation::DeleteRow { row })
    }

    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }
}
