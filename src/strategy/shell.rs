/*!
 * Alternate Removal
 *
 * Removal through a host facility distinct from the primary file API
 * (`rm -rf` on Unix, `rd`/`del` through cmd on Windows). These sometimes
 * succeed where the primary API fails because of different locking
 * semantics.
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::StrategyResult;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;
use crate::target::TargetKind;
use crate::tools::{run_tool, CommandRunner};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

/// Alternate high-level removal facility
#[cfg_attr(test, mockall::automock)]
pub trait AlternateRemover: Send + Sync {
    fn name(&self) -> &'static str;

    fn remove(&self, path: &Path, kind: TargetKind, deadline: TimeoutPolicy)
        -> StrategyResult<String>;
}

/// Shell removal commands run through the tool runner
pub struct ShellRemover {
    runner: Arc<dyn CommandRunner>,
}

impl ShellRemover {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Tool and arguments for the current platform
    pub fn command(path: &Path, kind: TargetKind) -> (&'static str, Vec<OsString>) {
        let target = path.as_os_str().to_os_string();
        if cfg!(windows) {
            let args = match kind {
                TargetKind::Directory => vec!["/C".into(), "rd".into(), "/S".into(), "/Q".into(), target],
                _ => vec!["/C".into(), "del".into(), "/F".into(), "/Q".into(), "/A".into(), target],
            };
            ("cmd", args)
        } else {
            ("rm", vec!["-rf".into(), "--".into(), target])
        }
    }
}

impl AlternateRemover for ShellRemover {
    fn name(&self) -> &'static str {
        if cfg!(windows) {
            "cmd rd/del"
        } else {
            "rm -rf"
        }
    }

    fn remove(
        &self,
        path: &Path,
        kind: TargetKind,
        deadline: TimeoutPolicy,
    ) -> StrategyResult<String> {
        let (tool, args) = Self::command(path, kind);
        let output = run_tool(self.runner.as_ref(), tool, &args, deadline)?;
        let detail = output.summary();
        Ok(if detail.is_empty() {
            format!("{} completed", self.name())
        } else {
            format!("{} completed: {}", self.name(), detail)
        })
    }
}

pub struct AlternateRemoval {
    timeout: TimeoutPolicy,
}

impl AlternateRemoval {
    pub const NAME: &'static str = "alternate-removal";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }
}

impl Strategy for AlternateRemoval {
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
        let deadline = ctx.tool_budget();
        ctx.caps()
            .remover
            .remove(ctx.target().path(), ctx.current_kind(), deadline)
    }
}
