/*!
 * Privilege Types
 */

use serde::{Deserialize, Serialize};

/// What an escalation pass managed to change
///
/// Partial results are normal: some descendants may stay inaccessible and
/// later strategies report their own failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationReport {
    /// Entries whose owner was changed to the acting principal
    pub ownership_changed: u64,
    /// Entries whose permission or attribute bits were relaxed
    pub access_granted: u64,
    /// Entries where some step failed
    pub failed: u64,
    /// Tool or per-entry notes worth surfacing in the diagnostic
    pub notes: Vec<String>,
}

impl EscalationReport {
    pub fn touched(&self) -> u64 {
        self.ownership_changed + self.access_granted
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn summary(&self) -> String {
        let mut summary = format!(
            "ownership changed on {}, access granted on {}, {} failed",
            self.ownership_changed, self.access_granted, self.failed
        );
        if let Some(first) = self.notes.first() {
            summary.push_str("; ");
            summary.push_str(first);
        }
        summary
    }
}
