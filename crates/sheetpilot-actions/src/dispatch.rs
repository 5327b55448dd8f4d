use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sheetpilot_model::{check, mutation, Capability, MutationIntent, PermissionMode, Table};
use sheetpilot_store::{DocumentStore, WorkbookSummary};

use crate::config::SheetpilotConfig;
use crate::error::ActionError;
use crate::extract::{extract_commands, ExtractedCommand};
use crate::outcome::ActionOutcome;

/// Everything one dispatch needs, passed explicitly instead of living in ambient session state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Assistant text to scan for commands.
    pub text: String,
    pub document_path: PathBuf,
    /// Sheet the extracted commands target; `None` is the first sheet.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Permission mode of the document, read fresh by the caller for this request.
    pub policy: PermissionMode,
}

/// Applies intents to documents, checking the permission policy first.
///
/// [`Dispatcher::default`] and [`Dispatcher::new`] create their own [`DocumentStore`]. Edits
/// through separate stores still exclude each other via the document's sidecar lock file, but
/// only components built from one store with [`Dispatcher::with_store`] or
/// [`DirectApi::new`](crate::DirectApi::new) share its in-process lock table.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    store: DocumentStore,
    config: SheetpilotConfig,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(SheetpilotConfig::default())
    }
}

impl Dispatcher {
    /// Dispatcher with a fresh store using `config.lock_timeout()`.
    pub fn new(config: SheetpilotConfig) -> Self {
        Self {
            store: DocumentStore::new(config.lock_timeout()),
            config,
        }
    }

    /// Share an existing store (and therefore its locks) with other components.
    pub fn with_store(store: DocumentStore, config: SheetpilotConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn config(&self) -> &SheetpilotConfig {
        &self.config
    }

    /// Extract every command from `request.text` and apply each one, in text order.
    ///
    /// Each intent is its own transaction: a failure is recorded and the batch continues,
    /// and earlier successes are never rolled back. Every recognized command yields exactly
    /// one outcome, including ones whose row number names no row.
    ///
    /// Row numbers are applied literally against the document as it is when each intent
    /// runs. After `delete row 2`, a later `delete row 3` in the same text removes the row
    /// that was originally fourth.
    pub fn dispatch(&self, request: &DispatchRequest) -> Vec<ActionOutcome> {
        let commands = extract_commands(&request.text);
        log::debug!(
            "extracted {} command(s) for {}",
            commands.len(),
            request.document_path.display()
        );

        let path = request.document_path.as_path();
        commands
            .into_iter()
            .map(|command| match command {
                ExtractedCommand::Intent(mut intent) => {
                    if intent.sheet.is_none() {
                        intent.sheet.clone_from(&request.sheet);
                    }
                    self.apply_intent(path, request.policy, &intent)
                }
                ExtractedCommand::InvalidRow { kind, row } => {
                    let err = match check(request.policy, kind.required_capability()) {
                        Ok(()) => self.missing_row(path, request.sheet.as_deref(), row),
                        Err(denied) => denied.into(),
                    };
                    let outcome = ActionOutcome::failed(kind, err);
                    log::warn!("{}: {}", path.display(), outcome.message);
                    outcome
                }
            })
            .collect()
    }

    /// Check `policy` for the intent's capability, then apply it under the document lock.
    pub fn apply_intent(
        &self,
        path: &Path,
        policy: PermissionMode,
        intent: &MutationIntent,
    ) -> ActionOutcome {
        let capability = intent.kind().required_capability();
        let result = check(policy, capability)
            .map_err(ActionError::from)
            .and_then(|()| self.mutate(path, intent));

        match result {
            Ok(()) => {
                let outcome = ActionOutcome::applied(intent);
                log::info!("{}: {}", path.display(), outcome.message);
                outcome
            }
            Err(err) => {
                let outcome = ActionOutcome::failed(intent.kind(), err);
                log::warn!("{}: {}", path.display(), outcome.message);
                outcome
            }
        }
    }

    /// Error for a row number that cannot exist, sized against the sheet as it is now.
    fn missing_row(&self, path: &Path, sheet: Option<&str>, row: String) -> ActionError {
        match self.store.load(path, sheet) {
            Ok(table) => ActionError::RowOutOfRange {
                row,
                len: table.row_count(),
            },
            Err(err) => err.into(),
        }
    }

    fn mutate(&self, path: &Path, intent: &MutationIntent) -> Result<(), ActionError> {
        self.store
            .mutate(path, intent.sheet.as_deref(), |table| {
                mutation::apply(table, &intent.mutation).map_err(ActionError::from)
            })
            .map(|_| ())
    }

    /// Up to `preview_rows` rows of one sheet, for documents that grant reading.
    pub fn read_rows(
        &self,
        path: &Path,
        sheet: Option<&str>,
        policy: PermissionMode,
    ) -> Result<Table, ActionError> {
        check(policy, Capability::Read)?;
        let table = self.store.load(path, sheet)?;
        if table.row_count() <= self.config.preview_rows {
            return Ok(table);
        }

        let (columns, mut rows) = table.into_parts();
        rows.truncate(self.config.preview_rows);
        Table::new(columns, rows).map_err(|err| ActionError::Io {
            detail: err.to_string(),
        })
    }

    /// Sheet names plus a short sample of every sheet.
    pub fn summary(
        &self,
        path: &Path,
        policy: PermissionMode,
    ) -> Result<WorkbookSummary, ActionError> {
        check(policy, Capability::Read)?;
        Ok(self
            .store
            .workbook_summary(path, self.config.summary_sample_rows)?)
    }
}
