/*!
 * Windows Ownership Escalation
 *
 * takeown (recursive, answer yes), icacls full control for the
 * Administrators group and the current user, then attrib to strip
 * read-only, system and hidden bits.
 */

use super::traits::OwnershipEscalator;
use super::types::EscalationReport;
use crate::core::errors::{StrategyError, StrategyResult};
use crate::core::limits::TOOL_DEADLINE_MARGIN;
use crate::core::timeout::Deadline;
use crate::tools::{run_tool, CommandRunner, ToolError};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Well-known SID of BUILTIN\Administrators (locale independent)
const ADMINISTRATORS_SID: &str = "*S-1-5-32-544";

pub struct WindowsOwnershipEscalator {
    runner: Arc<dyn CommandRunner>,
}

impl WindowsOwnershipEscalator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn step(
        &self,
        tool: &str,
        args: Vec<OsString>,
        deadline: Deadline,
        report: &mut EscalationReport,
    ) -> bool {
        let budget = deadline.tool_budget(TOOL_DEADLINE_MARGIN);
        match run_tool(self.runner.as_ref(), tool, &args, budget) {
            Ok(_) => true,
            Err(e @ ToolError::NotFound(_)) => {
                report.failed += 1;
                report.note(e.to_string());
                false
            }
            Err(e) => {
                // /C makes icacls continue past entries it cannot touch
                debug!(tool, error = %e, "escalation step reported errors");
                report.failed += 1;
                report.note(format!("{}: {}", tool, e));
                false
            }
        }
    }
}

/// takeown arguments for a file or a tree
pub fn takeown_args(target: &Path, is_dir: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["/F".into(), target.as_os_str().to_os_string()];
    if is_dir {
        args.extend(["/R".into(), "/D".into(), "Y".into()]);
    }
    args
}

/// icacls arguments granting full control to `principal`
pub fn icacls_args(target: &Path, principal: &str, is_dir: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        target.as_os_str().to_os_string(),
        "/grant".into(),
        format!("{}:F", principal).into(),
    ];
    if is_dir {
        args.push("/T".into());
    }
    args.extend(["/C".into(), "/Q".into()]);
    args
}

/// attrib arguments clearing read-only, system and hidden bits
pub fn attrib_args(target: &Path, is_dir: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-R".into(), "-S".into(), "-H".into()];
    if is_dir {
        let mut pattern = target.as_os_str().to_os_string();
        pattern.push("\\*");
        args.push(pattern);
        args.extend(["/S".into(), "/D".into()]);
    } else {
        args.push(target.as_os_str().to_os_string());
    }
    args
}

impl OwnershipEscalator for WindowsOwnershipEscalator {
    fn escalate(&self, target: &Path, deadline: Deadline) -> StrategyResult<EscalationReport> {
        let is_dir = std::fs::symlink_metadata(target)
            .map_err(|e| StrategyError::from_io(e, format!("stat {}", target.display())))?
            .is_dir();
        let mut report = EscalationReport::default();

        if self.step("takeown", takeown_args(target, is_dir), deadline, &mut report) {
            report.ownership_changed += 1;
        }

        let mut principals = vec![ADMINISTRATORS_SID.to_string()];
        if let Ok(user) = std::env::var("USERNAME") {
            principals.push(user);
        }
        for principal in principals {
            let args = icacls_args(target, &principal, is_dir);
            if self.step("icacls", args, deadline, &mut report) {
                report.access_granted += 1;
            }
        }

        if is_dir {
            // attrib with a wildcard skips the directory itself
            let _ = self.step("attrib", attrib_args(target, false), deadline, &mut report);
        }
        if self.step("attrib", attrib_args(target, is_dir), deadline, &mut report) {
            report.access_granted += 1;
        }

        if report.touched() == 0 {
            return Err(StrategyError::Privilege(format!(
                "could not take ownership of {}: {}",
                target.display(),
                report.notes.join("; ")
            )));
        }
        Ok(report)
    }
}
