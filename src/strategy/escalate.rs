/*!
 * Escalate Ownership
 * Take ownership and grant full control, then retry direct removal
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::StrategyResult;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;
use tracing::warn;

pub struct EscalateOwnership {
    timeout: TimeoutPolicy,
}

impl EscalateOwnership {
    pub const NAME: &'static str = "escalate-ownership";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }
}

impl Strategy for EscalateOwnership {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invasiveness(&self) -> Invasiveness {
        Invasiveness::Moderate
    }

    fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String> {
        // A failed escalation still gets its removal retry
        let escalation = ctx
            .caps()
            .escalator
            .escalate(ctx.target().path(), ctx.deadline());
        let summary = match escalation {
            Ok(report) => {
                ctx.mark_escalated();
                report.summary()
            }
            Err(e) => {
                warn!(error = %e, "ownership escalation failed");
                format!("escalation failed: {}", e)
            }
        };

        ctx.remove_with_retry().map_err(|e| e.context(&summary))?;
        Ok(format!("{}; removed on retry", summary))
    }
}
