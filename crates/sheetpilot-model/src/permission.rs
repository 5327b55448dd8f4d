//! Per-document permission policy.
//!
//! Modes form a total order (`Read < ReadWrite < ReadWriteDelete`) and every higher mode
//! includes the capabilities of the lower ones. The gate is a pure function of
//! `(mode, capability)`; callers evaluate it before every mutation attempt since the mode
//! can be changed out-of-band between requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMode {
    Read,
    ReadWrite,
    ReadWriteDelete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Read,
    Write,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("permission denied: {capability} requires {required} mode, document is {mode}")]
pub struct PermissionDenied {
    pub capability: Capability,
    pub mode: PermissionMode,
    pub required: PermissionMode,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown permission mode `{0}` (expected read, read_write or read_write_delete)")]
pub struct ParsePermissionModeError(String);

impl PermissionMode {
    pub const ALL: [PermissionMode; 3] = [
        PermissionMode::Read,
        PermissionMode::ReadWrite,
        PermissionMode::ReadWriteDelete,
    ];

    /// Lowest mode that grants `capability`.
    pub fn required_for(capability: Capability) -> PermissionMode {
        match capability {
            Capability::Read => PermissionMode::Read,
            Capability::Write => PermissionMode::ReadWrite,
            Capability::Delete => PermissionMode::ReadWriteDelete,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionMode::Read => "read",
            PermissionMode::ReadWrite => "read_write",
            PermissionMode::ReadWriteDelete => "read_write_delete",
        }
    }
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Write => "write",
            Capability::Delete => "delete",
        }
    }
}

/// Whether a document in `mode` may perform `capability`.
pub fn allows(mode: PermissionMode, capability: Capability) -> bool {
    match (capability, mode) {
        (Capability::Read, _) => true,
        (Capability::Write, PermissionMode::Read) => false,
        (Capability::Write, PermissionMode::ReadWrite | PermissionMode::ReadWriteDelete) => true,
        (Capability::Delete, PermissionMode::ReadWriteDelete) => true,
        (Capability::Delete, PermissionMode::Read | PermissionMode::ReadWrite) => false,
    }
}

/// [`allows`] as a `Result`, carrying enough context for an audit message.
pub fn check(mode: PermissionMode, capability: Capability) -> Result<(), PermissionDenied> {
    if allows(mode, capability) {
        Ok(())
    } else {
        Err(PermissionDenied {
            capability,
            mode,
            required: PermissionMode::required_for(capability),
        })
    }
}

impl fmt::Display for PermissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionMode {
    type Err = ParsePermissionModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        PermissionMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ParsePermissionModeError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPABILITIES: [Capability; 3] = [Capability::Read, Capability::Write, Capability::Delete];

    #[test]
    fn read_mode_never_writes_or_deletes() {
        assert!(allows(PermissionMode::Read, Capability::Read));
        assert!(!allows(PermissionMode::Read, Capability::Write));
        assert!(!allows(PermissionMode::Read, Capability::Delete));
    }

    #[test]
    fn full_mode_allows_everything() {
        for capability in CAPABILITIES {
            assert!(allows(PermissionMode::ReadWriteDelete, capability));
        }
        assert!(!allows(PermissionMode::ReadWrite, Capability::Delete));
    }

    #[test]
    fn gate_is_monotonic_in_mode_order() {
        for capability in CAPABILITIES {
            for lower in PermissionMode::ALL {
                for higher in PermissionMode::ALL.into_iter().filter(|m| *m >= lower) {
                    if allows(lower, capability) {
                        assert!(
                            allows(higher, capability),
                            "{higher} should include {capability} granted to {lower}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn gate_matches_minimum_required_mode() {
        for capability in CAPABILITIES {
            for mode in PermissionMode::ALL {
                assert_eq!(
                    allows(mode, capability),
                    mode >= PermissionMode::required_for(capability)
                );
            }
        }
    }

    #[test]
    fn check_reports_required_mode() {
        let err = check(PermissionMode::ReadWrite, Capability::Delete).unwrap_err();
        assert_eq!(err.required, PermissionMode::ReadWriteDelete);
        assert_eq!(
            err.to_string(),
            "permission denied: delete requires read_write_delete mode, document is read_write"
        );
    }

    #[test]
    fn wire_strings_round_trip() {
        for mode in PermissionMode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
            assert_eq!(mode.as_str().parse::<PermissionMode>().unwrap(), mode);
        }
        assert_eq!(
            "READ_WRITE".parse::<PermissionMode>().unwrap(),
            PermissionMode::ReadWrite
        );
        assert!("admin".parse::<PermissionMode>().is_err());
    }
}
