/*!
 * Session Report
 * The only artifact a reclamation returns to its caller
 */

use crate::core::serde::{
    duration_millis, is_empty_vec, is_false, is_none, optional_pathbuf_string, pathbuf_string,
};
use crate::core::types::Size;
use crate::orchestrator::{AttemptRecord, Outcome, ReclamationSession};
use crate::process::Termination;
use crate::target::TargetKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Structured result of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    #[serde(with = "pathbuf_string")]
    pub target: PathBuf,
    /// Kind observed at session start
    pub kind: TargetKind,
    pub outcome: Outcome,
    pub attempts: Vec<AttemptRecord>,
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub terminated: Vec<Termination>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub escalated: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub cancelled: bool,
    pub size_bytes: Size,
    pub entries: u64,
    /// Entries still present beneath the target when not deleted
    #[serde(default, skip_serializing_if = "is_none")]
    pub residual_entries: Option<u64>,
    /// Throwaway path left behind by a failed rename rollback
    #[serde(
        default,
        with = "optional_pathbuf_string",
        skip_serializing_if = "is_none"
    )]
    pub residue_path: Option<PathBuf>,
    #[serde(rename = "elapsed_ms", with = "duration_millis")]
    pub elapsed: Duration,
}

impl SessionReport {
    pub fn from_session(session: &ReclamationSession) -> Self {
        let footprint = session.footprint();
        Self {
            session_id: session.id(),
            target: session.target().path().to_path_buf(),
            kind: session.target().initial_kind(),
            outcome: session.outcome(),
            attempts: session.attempts().to_vec(),
            terminated: session.terminated().to_vec(),
            escalated: session.escalated(),
            cancelled: session.is_cancelled(),
            size_bytes: footprint.bytes,
            entries: footprint.entries,
            residual_entries: session.residual_entries(),
            residue_path: session.residue_path().cloned(),
            elapsed: session.elapsed(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.outcome == Outcome::Deleted
    }

    /// Whether a restart is needed to finish the job
    pub fn needs_restart(&self) -> bool {
        self.outcome == Outcome::ScheduledForDeferredDeletion
    }

    /// Name of the attempt that removed the target, if any
    pub fn succeeded_by(&self) -> Option<&str> {
        self.attempts
            .iter()
            .find(|a| a.succeeded)
            .map(|a| a.strategy.as_str())
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.strategy.as_str()).collect()
    }

    /// Pids whose termination succeeded
    pub fn terminated_pids(&self) -> Vec<crate::core::types::Pid> {
        self.terminated
            .iter()
            .filter(|t| t.is_terminated())
            .map(|t| t.pid)
            .collect()
    }
}
