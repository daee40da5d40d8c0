/*!
 * Privilege Traits
 */

use super::types::EscalationReport;
use crate::core::errors::StrategyResult;
use crate::core::timeout::Deadline;
use std::path::Path;

/// Makes the acting principal owner of the target with full control
///
/// Idempotent. Ownership is applied top-down and tolerates partial
/// failure; an error means nothing at all could be changed. Every tool
/// run is bounded by what is left of `deadline`.
#[cfg_attr(test, mockall::automock)]
pub trait OwnershipEscalator: Send + Sync {
    fn escalate(&self, target: &Path, deadline: Deadline) -> StrategyResult<EscalationReport>;
}
