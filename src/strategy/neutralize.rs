/*!
 * Neutralize Contents
 * Truncate resisting files to zero bytes in place, then retry removal.
 * Even when the final unlink fails, the data is no longer exposed.
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::StrategyResult;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;
use tracing::warn;

pub struct NeutralizeContents {
    timeout: TimeoutPolicy,
}

impl NeutralizeContents {
    pub const NAME: &'static str = "neutralize-contents";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }
}

impl Strategy for NeutralizeContents {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invasiveness(&self) -> Invasiveness {
        Invasiveness::High
    }

    fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String> {
        let summary = match ctx.caps().files.neutralize(ctx.target().path()) {
            Ok(report) => format!(
                "truncated {} files ({} bytes released, {} refused)",
                report.truncated, report.bytes_released, report.failed
            ),
            Err(e) => {
                warn!(error = %e, "truncation failed");
                format!("truncation failed: {}", e)
            }
        };

        ctx.remove_with_retry().map_err(|e| e.context(&summary))?;
        Ok(format!("{}; removed on retry", summary))
    }
}
