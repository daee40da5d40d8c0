/*!
 * Reclamation Session
 *
 * One end-to-end attempt against a single target: the attempts made,
 * the holders terminated, whether escalation ran, and the final outcome.
 */

use crate::core::errors::FailureKind;
use crate::core::serde::{duration_millis, is_none};
use crate::core::types::Invasiveness;
use crate::process::Termination;
use crate::strategy::Effects;
use crate::target::{Footprint, Target};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Final state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Target absent on re-check
    Deleted,
    /// Terminal fallback accepted by the OS
    ScheduledForDeferredDeletion,
    /// Nothing worked and nothing was scheduled
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deleted => "deleted",
            Self::ScheduledForDeferredDeletion => "scheduled for deferred deletion",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One strategy attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub strategy: String,
    pub invasiveness: Invasiveness,
    pub succeeded: bool,
    pub diagnostic: String,
    #[serde(default, skip_serializing_if = "is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(rename = "duration_ms", with = "duration_millis")]
    pub duration: Duration,
}

impl AttemptRecord {
    pub fn success(
        strategy: &str,
        invasiveness: Invasiveness,
        diagnostic: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            invasiveness,
            succeeded: true,
            diagnostic: diagnostic.into(),
            error_kind: None,
            duration,
        }
    }

    pub fn failure(
        strategy: &str,
        invasiveness: Invasiveness,
        kind: FailureKind,
        diagnostic: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            strategy: strategy.to_string(),
            invasiveness,
            succeeded: false,
            diagnostic: diagnostic.into(),
            error_kind: Some(kind),
            duration,
        }
    }
}

/// Mutable state of one in-flight reclamation
#[derive(Debug)]
pub struct ReclamationSession {
    id: Uuid,
    target: Target,
    footprint: Footprint,
    attempts: Vec<AttemptRecord>,
    terminated: Vec<Termination>,
    escalated: bool,
    cancelled: bool,
    residue_path: Option<PathBuf>,
    residual_entries: Option<u64>,
    outcome: Option<Outcome>,
    started: Instant,
    elapsed: Option<Duration>,
}

impl ReclamationSession {
    pub fn new(id: Uuid, target: Target) -> Self {
        Self {
            id,
            target,
            footprint: Footprint::default(),
            attempts: Vec::new(),
            terminated: Vec::new(),
            escalated: false,
            cancelled: false,
            residue_path: None,
            residual_entries: None,
            outcome: None,
            started: Instant::now(),
            elapsed: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn set_footprint(&mut self, footprint: Footprint) {
        self.footprint = footprint;
    }

    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    pub fn record(&mut self, attempt: AttemptRecord) {
        self.attempts.push(attempt);
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Fold in what strategies reported through the context
    pub fn absorb(&mut self, effects: Effects) {
        self.terminated = effects.terminated;
        self.escalated |= effects.escalated;
        if effects.residue.is_some() {
            self.residue_path = effects.residue;
        }
    }

    pub fn terminated(&self) -> &[Termination] {
        &self.terminated
    }

    pub fn escalated(&self) -> bool {
        self.escalated
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn residue_path(&self) -> Option<&PathBuf> {
        self.residue_path.as_ref()
    }

    pub fn set_residual_entries(&mut self, entries: u64) {
        self.residual_entries = Some(entries);
    }

    pub fn residual_entries(&self) -> Option<u64> {
        self.residual_entries
    }

    /// Set the outcome and stop the clock
    pub fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.elapsed = Some(self.started.elapsed());
    }

    /// Failed until finished otherwise
    pub fn outcome(&self) -> Outcome {
        self.outcome.unwrap_or(Outcome::Failed)
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }
}
