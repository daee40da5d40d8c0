/*!
 * Dry-Run Plan
 *
 * What a session would act on, without acting: the target's footprint,
 * the processes currently holding it, and the strategies in the order
 * they would run. Producing a plan never removes, renames, signals or
 * registers anything.
 */

use crate::core::serde::{is_empty_vec, is_false, is_none, pathbuf_string};
use crate::core::types::{Invasiveness, Size};
use crate::scanner::LockHolder;
use crate::strategy::Strategy;
use crate::target::TargetKind;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::PathBuf;

/// One strategy as it would be scheduled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub strategy: String,
    pub invasiveness: Invasiveness,
    #[serde(default, skip_serializing_if = "is_none")]
    pub timeout_ms: Option<u64>,
}

impl PlannedStep {
    pub fn of(strategy: &dyn Strategy) -> Self {
        Self {
            strategy: strategy.name().to_string(),
            invasiveness: strategy.invasiveness(),
            timeout_ms: strategy.timeout().duration().map(|d| d.as_millis() as u64),
        }
    }
}

/// Read-only preview of one reclamation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclaimPlan {
    #[serde(with = "pathbuf_string")]
    pub target: PathBuf,
    pub kind: TargetKind,
    pub size_bytes: Size,
    pub entries: u64,
    #[serde(default, skip_serializing_if = "is_empty_vec")]
    pub holders: Vec<LockHolder>,
    /// Why holders could not be enumerated, if they could not
    #[serde(default, skip_serializing_if = "is_none")]
    pub scan_error: Option<String>,
    /// Allow-listed processes would be swept with the holders
    #[serde(default, skip_serializing_if = "is_false")]
    pub sweep_allow_list: bool,
    pub steps: Vec<PlannedStep>,
    /// Terminal fallback, when deferred deletion is enabled
    #[serde(default, skip_serializing_if = "is_none")]
    pub fallback: Option<PlannedStep>,
    /// Filled in by the service from its elevation check
    #[serde(default, skip_serializing_if = "is_none")]
    pub elevated: Option<bool>,
}

impl ReclaimPlan {
    /// Nothing to do: the target is already gone
    pub fn is_noop(&self) -> bool {
        self.kind.is_absent()
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.strategy.as_str()).collect()
    }
}

pub fn render_plan_text(plan: &ReclaimPlan) -> String {
    let mut out = String::new();
    if plan.is_noop() {
        let _ = write!(out, "{}: already absent; nothing to do", plan.target.display());
        return out;
    }

    let _ = writeln!(
        out,
        "{} ({}, {} bytes in {} entries) [dry run]",
        plan.target.display(),
        plan.kind,
        plan.size_bytes,
        plan.entries
    );

    match (&plan.scan_error, plan.holders.is_empty()) {
        (Some(error), _) => {
            let _ = writeln!(out, "  holders: unknown ({})", error);
        }
        (None, true) => {
            let _ = writeln!(out, "  holders: none found");
        }
        (None, false) => {
            let _ = writeln!(out, "  holders:");
            for holder in &plan.holders {
                let _ = writeln!(out, "    {} {} ({:?})", holder.pid, holder.name, holder.source);
            }
        }
    }
    if plan.sweep_allow_list {
        let _ = writeln!(out, "  allow-listed processes would be terminated as well");
    }
    if plan.elevated == Some(false) {
        let _ = writeln!(out, "  not elevated; escalation and termination will likely fail");
    }

    let _ = writeln!(out, "  would try, in order:");
    for (index, step) in plan.steps.iter().enumerate() {
        let _ = writeln!(
            out,
            "    {}. {:<20} {:<8} {}",
            index + 1,
            step.strategy,
            step.invasiveness,
            step.timeout_ms
                .map(|ms| format!("{}ms", ms))
                .unwrap_or_else(|| "unbounded".to_string())
        );
    }
    match &plan.fallback {
        Some(fallback) => {
            let _ = write!(out, "  then, if all fail: {}", fallback.strategy);
        }
        None => out.push_str("  then, if all fail: stop (deferred deletion disabled)"),
    }
    out
}

pub fn render_plan_json(plan: &ReclaimPlan) -> serde_json::Result<String> {
    serde_json::to_string_pretty(plan)
}
