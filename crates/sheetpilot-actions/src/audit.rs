use std::fmt;

use crate::outcome::ActionOutcome;

/// Human-readable record of one dispatch, attached to the conversation that caused it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditReport {
    pub actions: Vec<String>,
    pub errors: Vec<String>,
}

impl AuditReport {
    pub fn from_outcomes(outcomes: &[ActionOutcome]) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            if outcome.success {
                report.actions.push(outcome.message.clone());
            } else {
                report.errors.push(outcome.message.clone());
            }
        }
        report
    }

    /// No command was recognized at all.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.errors.is_empty()
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("No table commands found in the message.");
        }

        if self.actions.is_empty() {
            f.write_str("No table actions were performed.")?;
        } else {
            f.write_str("Table actions performed:")?;
            for action in &self.actions {
                write!(f, "\n{action}")?;
            }
        }

        if !self.errors.is_empty() {
            f.write_str("\n\nErrors:")?;
            for error in &self.errors {
                write!(f, "\n{error}")?;
            }
        }
        Ok(())
    }
}
