/*!
 * Timeout Policies
 *
 * Type-safe timeout classes for every bounded wait in the engine.
 *
 * ## Timeout Classes
 *
 * - **Strategy**: 1s-120s (one strategy attempt, enforced by the orchestrator)
 * - **Tool**: external process runtime, slightly under its strategy's bound
 * - **Wait**: short polling waits (process exit, grace periods)
 * - **Custom**: User-defined
 *
 * ## Deadlines
 *
 * A strategy attempt gets one absolute [`Deadline`]. Every tool the
 * strategy runs is bounded by what is left of it, never by a fresh copy
 * of the full strategy bound.
 */

use std::time::{Duration, Instant};

/// Timeout policy for blocking operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// No timeout (infinite wait) - use sparingly!
    None,

    /// Strategy attempt timeout
    Strategy(Duration),

    /// External tool runtime
    Tool(Duration),

    /// Polling wait (process exit, grace period)
    Wait(Duration),

    /// Custom timeout
    Custom(Duration),
}

impl TimeoutPolicy {
    /// Get the duration for this policy
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Strategy(d) | Self::Tool(d) | Self::Wait(d) | Self::Custom(d) => Some(*d),
        }
    }

    /// Check if this timeout has expired
    pub fn is_expired(&self, start: Instant) -> bool {
        match self.duration() {
            None => false,
            Some(d) => start.elapsed() >= d,
        }
    }

    /// Get remaining time before timeout
    pub fn remaining(&self, start: Instant) -> Option<Duration> {
        self.duration().map(|d| d.saturating_sub(start.elapsed()))
    }

    /// Get timeout category as string
    pub fn category(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Strategy(_) => "strategy",
            Self::Tool(_) => "tool",
            Self::Wait(_) => "wait",
            Self::Custom(_) => "custom",
        }
    }
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::None
    }
}

/// Absolute point by which one attempt must be done
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn unbounded() -> Self {
        Self { at: None }
    }

    /// Deadline `policy` from now
    pub fn after(policy: TimeoutPolicy) -> Self {
        Self {
            at: policy.duration().map(|d| Instant::now() + d),
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == Some(Duration::ZERO)
    }

    /// Bound for the next tool: what is left, minus `margin`
    pub fn tool_budget(&self, margin: Duration) -> TimeoutPolicy {
        match self.remaining() {
            None => TimeoutPolicy::None,
            Some(left) => TimeoutPolicy::Tool(left.saturating_sub(margin)),
        }
    }
}
