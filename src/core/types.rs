/*!
 * Core Types
 * Common types used across the reclamation engine
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// OS process ID type
pub type Pid = u32;

/// Size type for byte accounting
pub type Size = u64;

/// Relative invasiveness of a removal strategy
///
/// Used for ordering and logging only; correctness never depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Invasiveness {
    /// Plain API calls, no side effects beyond the delete itself
    Minimal,
    /// Touches other processes or renames the target
    Low,
    /// Rewrites metadata or content of the target
    Moderate,
    /// Kills processes or delegates to external tools
    High,
    /// Persists intent in OS startup state
    Terminal,
}

impl Invasiveness {
    /// Short label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for Invasiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
