/*!
 * Direct Removal
 * Plain recursive delete through the primary file API
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::{StrategyError, StrategyResult};
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;

pub struct DirectRemoval {
    timeout: TimeoutPolicy,
}

impl DirectRemoval {
    pub const NAME: &'static str = "direct-removal";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }
}

impl Strategy for DirectRemoval {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invasiveness(&self) -> Invasiveness {
        Invasiveness::Minimal
    }

    fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String> {
        let path = ctx.target().path();
        let kind = ctx.current_kind();
        ctx.caps()
            .files
            .remove(path)
            .map_err(|e| StrategyError::from_io(e, format!("remove {}", path.display())))?;
        Ok(format!("removed {} directly", kind))
    }
}
