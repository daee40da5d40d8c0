/*!
 * Scanner Types
 */

use crate::core::errors::StrategyError;
use crate::core::serde::{is_none, optional_pathbuf_string};
use crate::core::types::Pid;
use crate::tools::ToolError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Scan operation result
pub type ScanResult<T> = Result<T, ScanError>;

/// Scanner errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Handle enumeration unavailable: {0}")]
    Unsupported(String),

    #[error("Handle enumeration failed: {0}")]
    Failed(String),
}

impl From<ToolError> for ScanError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(_) => ScanError::Unsupported(err.to_string()),
            other => ScanError::Failed(other.to_string()),
        }
    }
}

impl From<ScanError> for StrategyError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Unsupported(_) => StrategyError::PlatformUnsupported(err.to_string()),
            ScanError::Failed(_) => StrategyError::Io(err.to_string()),
        }
    }
}

/// How a holder was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderSource {
    /// Open file descriptor or handle on the target
    HandleTable,
    /// Working directory inside the target
    WorkingDirectory,
    /// Executable or mapped image inside the target
    MappedImage,
    /// Name matched the target leaf (opt-in heuristic)
    NameHeuristic,
    /// Allow-listed lock-prone process (opt-in sweep)
    AllowList,
}

/// A process holding the target open
///
/// Discovered fresh per scan; never cached across strategies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: Pid,
    pub name: String,
    #[serde(
        default,
        with = "optional_pathbuf_string",
        skip_serializing_if = "is_none"
    )]
    pub path: Option<PathBuf>,
    pub source: HolderSource,
}

impl LockHolder {
    pub fn new(pid: Pid, name: impl Into<String>, source: HolderSource) -> Self {
        Self {
            pid,
            name: name.into(),
            path: None,
            source,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Ordered, pid-unique holder set; first source wins
pub fn merge_holders(sets: impl IntoIterator<Item = Vec<LockHolder>>) -> Vec<LockHolder> {
    let mut merged: Vec<LockHolder> = Vec::new();
    for holder in sets.into_iter().flatten() {
        if !merged.iter().any(|h| h.pid == holder.pid) {
            merged.push(holder);
        }
    }
    merged.sort_by_key(|h| h.pid);
    merged
}
