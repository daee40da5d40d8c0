/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal caller-contract errors
///
/// These are the only errors `reclaim` returns directly. Everything that
/// goes wrong inside a strategy becomes a failed attempt in the report.
#[derive(Error, Debug, Diagnostic)]
pub enum ReclaimError {
    #[error("Invalid target: {0}")]
    #[diagnostic(
        code(reclaim::invalid_target),
        help("Pass a non-empty path to an existing or already-removed file or directory.")
    )]
    InvalidTarget(String),

    #[error("Reclamation of {0} was not confirmed")]
    #[diagnostic(
        code(reclaim::not_confirmed),
        help("The caller must obtain explicit confirmation before any destructive step.")
    )]
    NotConfirmed(PathBuf),

    #[error("Refusing to reclaim protected path {0}")]
    #[diagnostic(
        code(reclaim::protected_path),
        help("System roots are refused unless protected paths are explicitly allowed.")
    )]
    ProtectedPath(PathBuf),

    #[error("A reclamation session for {0} is already in flight")]
    #[diagnostic(
        code(reclaim::busy),
        help("Only one session may operate on a given path at a time. Retry once it finishes.")
    )]
    Busy(PathBuf),

    #[error("Insufficient privilege: {0}")]
    #[diagnostic(
        code(reclaim::insufficient_privilege),
        help("Re-run elevated (root / Administrator) so ownership takeover and termination can work.")
    )]
    InsufficientPrivilege(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(reclaim::configuration),
        help("Review RECLAIM_* environment variables and the RECLAIM_CONFIG file.")
    )]
    Configuration(String),

    #[error("I/O error: {0}")]
    #[diagnostic(code(reclaim::io))]
    Io(String),
}

impl From<io::Error> for ReclaimError {
    fn from(err: io::Error) -> Self {
        ReclaimError::Io(err.to_string())
    }
}

/// Result type for entry-level operations
pub type ReclaimResult<T> = Result<T, ReclaimError>;

/// Strategy-level failures
///
/// Caught at the strategy boundary and converted into a failed attempt
/// record. Never aborts a session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// A lock could not be acquired or broken this attempt
    #[error("target is locked: {0}")]
    TransientLock(String),

    /// Escalation or access was refused
    #[error("privilege error: {0}")]
    Privilege(String),

    /// A capability is unavailable on this host
    #[error("unsupported on this platform: {0}")]
    PlatformUnsupported(String),

    /// The strategy exceeded its bound
    #[error("timed out after {elapsed_ms}ms (limit {limit_ms}ms)")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },

    /// The strategy panicked or its task was lost
    #[error("strategy faulted: {0}")]
    Fault(String),

    /// Unclassified I/O failure
    #[error("{0}")]
    Io(String),
}

/// Serializable classification of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TransientLock,
    Privilege,
    PlatformUnsupported,
    Timeout,
    Fault,
    Io,
    /// Routine reported success but the target is still present
    StillPresent,
}

impl StrategyError {
    /// Classify an I/O error from a removal primitive
    pub fn from_io(err: io::Error, context: impl AsRef<str>) -> Self {
        let message = format!("{}: {}", context.as_ref(), err);
        if err.kind() == io::ErrorKind::PermissionDenied {
            return StrategyError::Privilege(message);
        }
        if is_lock_error(&err) {
            return StrategyError::TransientLock(message);
        }
        StrategyError::Io(message)
    }

    /// Prefix the message with what the strategy did before failing
    pub fn context(self, prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref();
        let wrap = |message: String| format!("{}; {}", prefix, message);
        match self {
            Self::TransientLock(m) => Self::TransientLock(wrap(m)),
            Self::Privilege(m) => Self::Privilege(wrap(m)),
            Self::PlatformUnsupported(m) => Self::PlatformUnsupported(wrap(m)),
            Self::Fault(m) => Self::Fault(wrap(m)),
            Self::Io(m) => Self::Io(wrap(m)),
            timeout @ Self::Timeout { .. } => timeout,
        }
    }

    /// Get the serializable kind for reports
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::TransientLock(_) => FailureKind::TransientLock,
            Self::Privilege(_) => FailureKind::Privilege,
            Self::PlatformUnsupported(_) => FailureKind::PlatformUnsupported,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Fault(_) => FailureKind::Fault,
            Self::Io(_) => FailureKind::Io,
        }
    }
}

/// Result type for strategy routines
pub type StrategyResult<T> = Result<T, StrategyError>;

#[cfg(unix)]
fn is_lock_error(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(nix::libc::EBUSY) | Some(nix::libc::ETXTBSY)
    )
}

#[cfg(windows)]
fn is_lock_error(err: &io::Error) -> bool {
    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    matches!(err.raw_os_error(), Some(32) | Some(33))
}

#[cfg(not(any(unix, windows)))]
fn is_lock_error(_err: &io::Error) -> bool {
    false
}
