/*!
 * Process Types
 * Common types for lock-holder termination
 */

use crate::core::errors::StrategyError;
use crate::core::types::Pid;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Process operation result
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Process errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Process {0} is neither a discovered lock holder nor allow-listed")]
    NotEligible(Pid),

    #[error("Process {0} is protected (self, ancestor, or system process)")]
    Protected(Pid),

    #[error("Process not found: {0}")]
    ProcessNotFound(Pid),

    #[error("Permission denied signalling process {0}")]
    PermissionDenied(Pid),

    #[error("Signal to process {pid} failed: {reason}")]
    SignalFailed { pid: Pid, reason: String },

    #[error("Process {0} survived forced termination")]
    Survived(Pid),

    #[error("Process signalling is unsupported on this platform")]
    Unsupported,
}

impl From<ProcessError> for StrategyError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::PermissionDenied(_) => StrategyError::Privilege(err.to_string()),
            ProcessError::Unsupported => StrategyError::PlatformUnsupported(err.to_string()),
            ProcessError::Survived(_) => StrategyError::TransientLock(err.to_string()),
            _ => StrategyError::Io(err.to_string()),
        }
    }
}

/// One row of a process-table snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub name: String,
    pub exe: Option<PathBuf>,
    pub cmd: Vec<String>,
}

impl ProcessInfo {
    pub fn new(pid: Pid, parent: Option<Pid>, name: impl Into<String>) -> Self {
        Self {
            pid,
            parent,
            name: name.into(),
            exe: None,
            cmd: Vec::new(),
        }
    }

    pub fn with_exe(mut self, exe: impl Into<PathBuf>) -> Self {
        self.exe = Some(exe.into());
        self
    }

    pub fn with_cmd(mut self, cmd: Vec<String>) -> Self {
        self.cmd = cmd;
        self
    }
}

/// Termination signal strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// SIGTERM / polite close request
    Graceful,
    /// SIGKILL / TerminateProcess
    Forced,
}

/// How a process left the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum TerminationOutcome {
    /// Exited within the grace period
    Graceful,
    /// Needed the forced signal
    Forced,
    /// Already gone when we got to it
    AlreadyExited,
    /// Still alive, or could not be signalled
    Failed(String),
}

impl TerminationOutcome {
    pub fn is_terminated(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Per-process termination result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub pid: Pid,
    pub name: String,
    /// The eligible root this process was reached through
    pub root: Pid,
    pub outcome: TerminationOutcome,
}

impl Termination {
    pub fn is_terminated(&self) -> bool {
        self.outcome.is_terminated()
    }
}
