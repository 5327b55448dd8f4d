use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Runtime knobs. Every field is optional in the JSON form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetpilotConfig {
    /// How long an edit waits for another edit of the same document before giving up.
    pub lock_timeout_ms: u64,
    /// Maximum rows returned by a read preview.
    pub preview_rows: usize,
    /// Rows per sheet included in a workbook summary.
    pub summary_sample_rows: usize,
}

impl Default for SheetpilotConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            preview_rows: 1_000,
            summary_sample_rows: 5,
        }
    }
}

impl SheetpilotConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
