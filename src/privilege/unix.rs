/*!
 * Unix Ownership Escalation
 *
 * chown to the effective uid/gid top-down, owner rwx bits, and, when
 * running as root, clearing the immutable/append-only attributes that
 * block unlink even for root.
 */

use super::traits::OwnershipEscalator;
use super::types::EscalationReport;
use crate::core::errors::{StrategyError, StrategyResult};
use crate::core::limits::TOOL_DEADLINE_MARGIN;
use crate::core::timeout::Deadline;
use crate::tools::{run_tool, CommandRunner, ToolError};
use nix::unistd::{chown, getegid, geteuid, Gid, Uid};
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

const DIR_OWNER_BITS: u32 = 0o700;
const FILE_OWNER_BITS: u32 = 0o600;
const MAX_PASSES: usize = 3;

pub struct UnixOwnershipEscalator {
    runner: Arc<dyn CommandRunner>,
}

impl UnixOwnershipEscalator {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Returns whether anything changed, or None when a step failed
    fn take_entry(
        path: &Path,
        uid: Uid,
        gid: Gid,
        report: &mut EscalationReport,
    ) -> Option<bool> {
        let md = match fs::symlink_metadata(path) {
            Ok(md) => md,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "stat failed");
                return None;
            }
        };

        // Symlinks carry no access control of their own
        if md.file_type().is_symlink() {
            return Some(false);
        }

        let mut changed = false;
        let mut ok = true;

        if md.uid() != uid.as_raw() || md.gid() != gid.as_raw() {
            match chown(path, Some(uid), Some(gid)) {
                Ok(()) => {
                    report.ownership_changed += 1;
                    changed = true;
                }
                Err(e) => {
                    ok = false;
                    debug!(path = %path.display(), error = %e, "chown failed");
                }
            }
        }

        let bits = if md.is_dir() {
            DIR_OWNER_BITS
        } else {
            FILE_OWNER_BITS
        };
        if md.mode() & bits != bits {
            let mode = (md.mode() | bits) & 0o7777;
            match fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
                Ok(()) => {
                    report.access_granted += 1;
                    changed = true;
                }
                Err(e) => {
                    ok = false;
                    debug!(path = %path.display(), error = %e, "chmod failed");
                }
            }
        }

        ok.then_some(changed)
    }

    /// Unlinking needs write+search on the parent, which we relax only
    /// when we already own it
    fn open_parent(target: &Path, uid: Uid, report: &mut EscalationReport) {
        let Some(parent) = target.parent() else {
            return;
        };
        let Ok(md) = fs::metadata(parent) else {
            return;
        };
        if md.uid() != uid.as_raw() || md.mode() & 0o300 == 0o300 {
            return;
        }
        let mode = (md.mode() | 0o300) & 0o7777;
        match fs::set_permissions(parent, fs::Permissions::from_mode(mode)) {
            Ok(()) => report.access_granted += 1,
            Err(e) => {
                report.failed += 1;
                report.note(format!("parent {} not writable: {}", parent.display(), e));
            }
        }
    }

    /// `chattr -i -a`, recursively on the target and on its parent
    fn clear_attributes(
        &self,
        target: &Path,
        is_dir: bool,
        deadline: Deadline,
        report: &mut EscalationReport,
    ) {
        let mut args: Vec<OsString> = Vec::new();
        if is_dir {
            args.push("-R".into());
        }
        args.extend(["-f".into(), "-i".into(), "-a".into()]);
        args.push(target.as_os_str().to_os_string());

        let budget = deadline.tool_budget(TOOL_DEADLINE_MARGIN);
        match run_tool(self.runner.as_ref(), "chattr", &args, budget) {
            Ok(_) => report.access_granted += 1,
            Err(ToolError::NotFound(_)) => {
                report.note("chattr unavailable");
                return;
            }
            Err(e) => {
                // Filesystems without attribute support land here routinely
                debug!(error = %e, "chattr on target failed");
                report.note(format!("chattr: {}", e));
            }
        }

        if let Some(parent) = target.parent() {
            let args: Vec<OsString> = vec![
                "-f".into(),
                "-i".into(),
                "-a".into(),
                parent.as_os_str().to_os_string(),
            ];
            let budget = deadline.tool_budget(TOOL_DEADLINE_MARGIN);
            if let Err(e) = run_tool(self.runner.as_ref(), "chattr", &args, budget) {
                debug!(parent = %parent.display(), error = %e, "chattr on parent failed");
                report.note(format!("chattr on parent: {}", e));
            }
        }
    }
}

impl OwnershipEscalator for UnixOwnershipEscalator {
    fn escalate(&self, target: &Path, deadline: Deadline) -> StrategyResult<EscalationReport> {
        let uid = geteuid();
        let gid = getegid();
        let mut report = EscalationReport::default();

        let is_dir = fs::symlink_metadata(target)
            .map_err(|e| StrategyError::from_io(e, format!("stat {}", target.display())))?
            .is_dir();

        if uid.is_root() {
            self.clear_attributes(target, is_dir, deadline, &mut report);
        }

        Self::open_parent(target, uid, &mut report);

        // Top-down: a directory must be searchable before its children are
        // reachable. A directory we had to open up gets walked again.
        let mut failed = 0;
        for _ in 0..MAX_PASSES {
            if deadline.is_expired() {
                report.note("deadline reached during ownership walk");
                break;
            }
            failed = 0;
            let mut reopened = false;
            for entry in WalkDir::new(target).follow_links(false) {
                match entry {
                    Ok(entry) => {
                        if Self::take_entry(entry.path(), uid, gid, &mut report).is_none() {
                            failed += 1;
                        }
                    }
                    Err(e) => {
                        let fixed = e.path().map(|p| p.to_path_buf()).and_then(|path| {
                            Self::take_entry(&path, uid, gid, &mut report)
                        });
                        if fixed == Some(true) {
                            reopened = true;
                        } else {
                            failed += 1;
                        }
                    }
                }
            }
            if !reopened {
                break;
            }
        }
        report.failed += failed;

        if report.touched() == 0 && report.failed > 0 {
            warn!(target = %target.display(), failed = report.failed, "escalation changed nothing");
            return Err(StrategyError::Privilege(format!(
                "could not take ownership of {} ({} entries refused)",
                target.display(),
                report.failed
            )));
        }

        debug!(target = %target.display(), summary = %report.summary(), "escalation complete");
        Ok(report)
    }
}
