/*!
 * Terminate Holders
 * Lock scan, terminate discovered holders (and swept allow-listed
 * processes), then retry direct removal
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::StrategyResult;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::{Invasiveness, Pid};
use crate::process::ProcessTerminator;
use tracing::{info, warn};

pub struct TerminateHolders {
    timeout: TimeoutPolicy,
}

impl TerminateHolders {
    pub const NAME: &'static str = "terminate-holders";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }

    /// Eligible roots: discovered holders, plus allow-listed processes when swept
    fn eligible_roots(ctx: &StrategyContext) -> Vec<Pid> {
        let path = ctx.target().path();
        let holders = match ctx.caps().scanner.scan(path) {
            Ok(holders) => holders,
            Err(e) => {
                warn!(error = %e, "lock scan failed; continuing without holders");
                Vec::new()
            }
        };
        for holder in &holders {
            info!(pid = holder.pid, name = %holder.name, source = ?holder.source, "lock holder");
        }

        let mut roots: Vec<Pid> = holders.iter().map(|h| h.pid).collect();
        if let Some(allow_list) = ctx.sweep() {
            roots.extend(
                ctx.caps()
                    .processes
                    .snapshot()
                    .iter()
                    .filter(|p| allow_list.matches(p))
                    .map(|p| p.pid),
            );
        }
        roots.sort_unstable();
        roots.dedup();
        roots
    }
}

impl Strategy for TerminateHolders {
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
        let roots = Self::eligible_roots(ctx);

        let summary = if roots.is_empty() {
            "no lock holders found".to_string()
        } else {
            let terminator =
                ProcessTerminator::new(ctx.caps().processes.clone(), roots.iter().copied())
                    .with_grace_period(ctx.grace_period());
            let results = terminator.terminate_all(&roots);

            let (terminated, failed): (Vec<_>, Vec<_>) =
                results.into_iter().partition(|t| t.is_terminated());
            let pids: Vec<String> = terminated.iter().map(|t| t.pid.to_string()).collect();
            let summary = format!(
                "terminated {} of {} processes [{}]",
                terminated.len(),
                terminated.len() + failed.len(),
                pids.join(", ")
            );
            ctx.record_terminations(terminated);
            summary
        };

        ctx.remove_with_retry().map_err(|e| e.context(&summary))?;
        Ok(format!("{}; removed on retry", summary))
    }
}
