/*!
 * Tool Types
 */

use crate::core::errors::StrategyError;
use std::time::Duration;
use thiserror::Error;

/// Tool operation result
pub type ToolResult<T> = Result<T, ToolError>;

/// External tool errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("{0} is not available on this host")]
    NotFound(String),

    #[error("Invalid tool name: {0}")]
    InvalidTool(String),

    #[error("Failed to start {tool}: {reason}")]
    SpawnFailed { tool: String, reason: String },

    #[error("{tool} did not finish within {limit_ms}ms and was killed")]
    TimedOut {
        tool: String,
        elapsed_ms: u64,
        limit_ms: u64,
    },

    #[error("{tool} exited with status {status}: {detail}")]
    Failed {
        tool: String,
        status: i32,
        detail: String,
    },
}

impl From<ToolError> for StrategyError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(_) => StrategyError::PlatformUnsupported(err.to_string()),
            ToolError::TimedOut {
                elapsed_ms,
                limit_ms,
                ..
            } => StrategyError::Timeout {
                elapsed_ms,
                limit_ms,
            },
            ToolError::Failed { ref detail, .. } if mentions_denial(detail) => {
                StrategyError::Privilege(err.to_string())
            }
            ToolError::Failed { ref detail, .. } if mentions_busy(detail) => {
                StrategyError::TransientLock(err.to_string())
            }
            _ => StrategyError::Io(err.to_string()),
        }
    }
}

fn mentions_denial(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("permission denied")
        || lower.contains("operation not permitted")
        || lower.contains("access is denied")
}

fn mentions_busy(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    lower.contains("resource busy")
        || lower.contains("text file busy")
        || lower.contains("being used by another process")
}

/// Captured result of one tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; None when terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Last non-empty line of stderr, else of stdout
    pub fn summary(&self) -> String {
        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or_default()
            .to_string()
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}
