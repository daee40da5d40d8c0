/*!
 * Mirror To Empty
 *
 * Synchronizes an empty directory over the target with a mirroring tool
 * that deletes extraneous destination entries, then removes whatever is
 * left. Directories are mirrored directly; a single file is purged from
 * its parent through an include filter matching only its name.
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::{StrategyError, StrategyResult};
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;
use crate::target::TargetKind;
use crate::tools::{run_tool, CommandRunner, ToolError};
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::debug;

/// Robocopy exit codes at or above this signal failure
const ROBOCOPY_FAILURE: i32 = 8;

/// Directory-sync primitive
#[cfg_attr(test, mockall::automock)]
pub trait DirectoryMirror: Send + Sync {
    fn name(&self) -> &'static str;

    /// Make `path` empty (directory) or absent (file) by mirroring
    fn mirror_empty(
        &self,
        path: &Path,
        kind: TargetKind,
        deadline: TimeoutPolicy,
    ) -> StrategyResult<String>;
}

/// rsync on Unix, robocopy on Windows
pub struct SyncMirror {
    runner: Arc<dyn CommandRunner>,
}

impl SyncMirror {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    fn split(path: &Path) -> StrategyResult<(&Path, &std::ffi::OsStr)> {
        match (path.parent(), path.file_name()) {
            (Some(parent), Some(leaf)) => Ok((parent, leaf)),
            _ => Err(StrategyError::Io(format!(
                "{} has no parent directory",
                path.display()
            ))),
        }
    }

    fn rsync(
        &self,
        empty: &Path,
        path: &Path,
        kind: TargetKind,
        deadline: TimeoutPolicy,
    ) -> StrategyResult<String> {
        let args = rsync_args(empty, path, kind)?;
        run_tool(self.runner.as_ref(), "rsync", &args, deadline)?;
        Ok("rsync --delete mirrored an empty directory over the target".to_string())
    }

    fn robocopy(
        &self,
        empty: &Path,
        path: &Path,
        kind: TargetKind,
        deadline: TimeoutPolicy,
    ) -> StrategyResult<String> {
        let program = self
            .runner
            .locate("robocopy")
            .ok_or_else(|| ToolError::NotFound("robocopy".to_string()))?;

        let args = robocopy_args(empty, path, kind)?;
        let output = self.runner.run(&program, &args, deadline)?;
        match output.status {
            Some(code) if code < ROBOCOPY_FAILURE => {
                Ok(format!("robocopy mirrored an empty directory (exit {})", code))
            }
            status => Err(ToolError::Failed {
                tool: "robocopy".to_string(),
                status: status.unwrap_or(-1),
                detail: output.summary(),
            }
            .into()),
        }
    }
}

/// Trailing separator: copy the directory's contents, not the directory
fn as_contents(path: &Path) -> OsString {
    let mut s = path.as_os_str().to_os_string();
    s.push(std::path::MAIN_SEPARATOR_STR);
    s
}

/// Backslash-escape rsync wildcard characters in a literal name
fn escape_rsync_pattern(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub fn rsync_args(empty: &Path, path: &Path, kind: TargetKind) -> StrategyResult<Vec<OsString>> {
    let mut args: Vec<OsString> = vec!["-a".into(), "--delete".into()];
    match kind {
        TargetKind::Directory => {
            args.push(as_contents(empty));
            args.push(as_contents(path));
        }
        _ => {
            let (parent, leaf) = SyncMirror::split(path)?;
            let leaf = escape_rsync_pattern(&leaf.to_string_lossy());
            args.push(format!("--include=/{}", leaf).into());
            args.push("--exclude=*".into());
            args.push(as_contents(empty));
            args.push(as_contents(parent));
        }
    }
    Ok(args)
}

pub fn robocopy_args(
    empty: &Path,
    path: &Path,
    kind: TargetKind,
) -> StrategyResult<Vec<OsString>> {
    let mut args: Vec<OsString> = vec![empty.as_os_str().to_os_string()];
    match kind {
        TargetKind::Directory => {
            args.push(path.as_os_str().to_os_string());
            args.push("/MIR".into());
        }
        _ => {
            let (parent, leaf) = SyncMirror::split(path)?;
            args.push(parent.as_os_str().to_os_string());
            args.push(leaf.to_os_string());
            args.push("/PURGE".into());
        }
    }
    args.extend(
        ["/R:0", "/W:0", "/NFL", "/NDL", "/NJH", "/NJS", "/NP"]
            .iter()
            .map(OsString::from),
    );
    Ok(args)
}

impl DirectoryMirror for SyncMirror {
    fn name(&self) -> &'static str {
        if cfg!(windows) {
            "robocopy"
        } else {
            "rsync"
        }
    }

    fn mirror_empty(
        &self,
        path: &Path,
        kind: TargetKind,
        deadline: TimeoutPolicy,
    ) -> StrategyResult<String> {
        let empty = TempDir::new()
            .map_err(|e| StrategyError::from_io(e, "create empty mirror source"))?;
        debug!(source = %empty.path().display(), target = %path.display(), "mirroring empty directory");

        if cfg!(windows) {
            self.robocopy(empty.path(), path, kind, deadline)
        } else {
            self.rsync(empty.path(), path, kind, deadline)
        }
    }
}

pub struct MirrorToEmpty {
    timeout: TimeoutPolicy,
}

impl MirrorToEmpty {
    pub const NAME: &'static str = "mirror-to-empty";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }
}

impl Strategy for MirrorToEmpty {
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
        let kind = ctx.current_kind();
        let summary = ctx
            .caps()
            .mirror
            .mirror_empty(ctx.target().path(), kind, deadline)?;

        ctx.remove_with_retry().map_err(|e| e.context(&summary))?;
        Ok(format!("{}; emptied target removed", summary))
    }
}
