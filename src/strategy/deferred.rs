/*!
 * Deferred Deletion
 * Terminal fallback: ask the OS to remove the target at next system start
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::StrategyResult;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;

/// Never part of the regular sequence; the orchestrator runs it only on exhaustion
pub struct DeferredDeletion {
    timeout: TimeoutPolicy,
}

impl DeferredDeletion {
    pub const NAME: &'static str = "deferred-deletion";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }
}

impl Strategy for DeferredDeletion {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invasiveness(&self) -> Invasiveness {
        Invasiveness::Terminal
    }

    fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String> {
        let registrar = &ctx.caps().registrar;
        let detail = registrar.register(ctx.target().path())?;
        Ok(format!("{}: {}", registrar.name(), detail))
    }
}
