use serde::Serialize;
use sheetpilot_model::{MutationIntent, MutationKind};

use crate::error::ActionError;

/// Result of attempting one intent.
///
/// Serializes as `{"kind", "success", "message", "error"}` with `error` rendered as text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub kind: MutationKind,
    pub success: bool,
    pub message: String,
    pub error: Option<ActionError>,
}

impl ActionOutcome {
    pub fn applied(intent: &MutationIntent) -> Self {
        Self {
            kind: intent.kind(),
            success: true,
            message: intent.mutation.describe(),
            error: None,
        }
    }

    pub fn failed(kind: MutationKind, error: ActionError) -> Self {
        let action = match kind {
            MutationKind::Update => "update cell",
            MutationKind::Add => "add row",
            MutationKind::Delete => "delete row",
        };
        Self {
            kind,
            success: false,
            message: format!("Failed to {action}: {error}"),
            error: Some(error),
        }
    }

    /// Whether repeating this intent unchanged could succeed.
    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(ActionError::is_retryable)
    }
}
