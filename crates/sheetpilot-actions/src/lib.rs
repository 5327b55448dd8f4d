//! `sheetpilot-actions` connects assistant output to workbook edits.
//!
//! [`extract_commands`] finds table commands in free-form text, [`Dispatcher`] checks each one
//! against the document's [`PermissionMode`](sheetpilot_model::PermissionMode) and applies it
//! through the [`DocumentStore`](sheetpilot_store::DocumentStore), and [`AuditReport`] turns
//! the resulting outcomes into the message recorded alongside the conversation.

mod audit;
mod config;
mod direct;
mod dispatch;
mod error;
mod extract;
mod outcome;

pub use audit::AuditReport;
pub use config::{ConfigError, SheetpilotConfig};
pub use direct::{DirectApi, DirectResult};
pub use dispatch::{DispatchRequest, Dispatcher};
pub use error::ActionError;
pub use extract::{extract_commands, ExtractedCommand};
pub use outcome::ActionOutcome;
