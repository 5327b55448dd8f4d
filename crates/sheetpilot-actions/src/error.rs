use serde::{Serialize, Serializer};
use sheetpilot_model::{Capability, MutationError, PermissionDenied};
use sheetpilot_store::StoreError;
use thiserror::Error;

/// Why a single action failed. Shown to users verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("file not found: {path}")]
    FileNotFound { path: String },
    #[error("sheet '{sheet}' not found")]
    SheetNotFound { sheet: String },
    /// `row` is the 1-based row number as users write it, which may not fit an index.
    #[error("row {row} does not exist (table has {len} rows)")]
    RowOutOfRange { row: String, len: usize },
    #[error("column '{column}' does not exist")]
    ColumnNotFound { column: String },
    #[error("column '{column}' does not exist in the table")]
    UnknownColumn { column: String },
    #[error("permission denied: this document does not allow {capability}")]
    PermissionDenied { capability: Capability },
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

impl ActionError {
    /// Only I/O-class failures (including waiting too long for another edit) can succeed when
    /// the same action is repeated unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ActionError::Io { .. })
    }
}

impl From<MutationError> for ActionError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::RowOutOfRange { row, len } => ActionError::RowOutOfRange {
                row: (row as u128 + 1).to_string(),
                len,
            },
            MutationError::ColumnNotFound { column } => ActionError::ColumnNotFound { column },
            MutationError::UnknownColumn { column } => ActionError::UnknownColumn { column },
        }
    }
}

impl From<StoreError> for ActionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::FileNotFound(path) => ActionError::FileNotFound {
                path: path.display().to_string(),
            },
            StoreError::SheetNotFound { sheet } => ActionError::SheetNotFound { sheet },
            other => ActionError::Io {
                detail: other.to_string(),
            },
        }
    }
}

impl From<PermissionDenied> for ActionError {
    fn from(err: PermissionDenied) -> Self {
        ActionError::PermissionDenied {
            capability: err.capability,
        }
    }
}

impl Serialize for ActionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn only_io_is_retryable() {
        let timeout: ActionError = StoreError::LockTimeout {
            path: PathBuf::from("a.xlsx"),
            waited: Duration::from_secs(5),
        }
        .into();
        assert!(timeout.is_retryable());

        let missing: ActionError = StoreError::FileNotFound(PathBuf::from("a.xlsx")).into();
        assert_eq!(
            missing,
            ActionError::FileNotFound {
                path: "a.xlsx".into()
            }
        );
        assert!(!missing.is_retryable());

        let denied = ActionError::PermissionDenied {
            capability: Capability::Delete,
        };
        assert!(!denied.is_retryable());
        assert_eq!(
            denied.to_string(),
            "permission denied: this document does not allow delete"
        );
    }

    #[test]
    fn mutation_errors_keep_their_detail() {
        let err: ActionError = MutationError::RowOutOfRange { row: 9, len: 3 }.into();
        assert_eq!(err.to_string(), "row 10 does not exist (table has 3 rows)");

        let last: ActionError = MutationError::RowOutOfRange {
            row: usize::MAX,
            len: 3,
        }
        .into();
        assert_eq!(
            last,
            ActionError::RowOutOfRange {
                row: (usize::MAX as u128 + 1).to_string(),
                len: 3
            }
        );
    }
}
