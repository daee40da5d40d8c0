/*!
 * Strategy Traits
 */

use super::context::StrategyContext;
use crate::core::errors::StrategyResult;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;

/// One self-contained removal technique in the escalation sequence
///
/// `execute` returns diagnostic text on success. It must be safe to run
/// after an earlier strategy partially succeeded. Whether the target is
/// actually gone is decided by the orchestrator's re-check, not here.
#[cfg_attr(test, mockall::automock)]
pub trait Strategy: Send + Sync {
    /// Stable identifier used in reports
    fn name(&self) -> &'static str;

    /// Ordering and logging only
    fn invasiveness(&self) -> Invasiveness;

    /// Bounded wait enforced by the orchestrator
    fn timeout(&self) -> TimeoutPolicy;

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String>;
}
