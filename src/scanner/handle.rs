/*!
 * handle.exe Scanner
 *
 * Uses Sysinternals handle.exe when it is on PATH. Output lines look like
 *
 * ```text
 * explorer.exe       pid: 4321   type: File           1A4: C:\Users\me\target\a.txt
 * ```
 */

use super::traits::HandleScanner;
use super::types::*;
use crate::core::limits::HANDLE_SCAN_TIMEOUT;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Pid;
use crate::tools::{CommandRunner, ToolError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const CANDIDATES: &[&str] = &["handle64", "handle"];

pub struct HandleExeScanner {
    runner: Arc<dyn CommandRunner>,
    program: PathBuf,
}

impl HandleExeScanner {
    /// Available only when handle.exe can be located
    pub fn discover(runner: Arc<dyn CommandRunner>) -> Option<Self> {
        let program = CANDIDATES.iter().find_map(|tool| runner.locate(tool))?;
        Some(Self { runner, program })
    }
}

impl HandleScanner for HandleExeScanner {
    fn name(&self) -> &'static str {
        "handle.exe"
    }

    fn scan(&self, target: &Path) -> ScanResult<Vec<LockHolder>> {
        let args: Vec<OsString> = vec![
            "-accepteula".into(),
            "-nobanner".into(),
            target.as_os_str().to_os_string(),
        ];
        let output = self.runner.run(
            &self.program,
            &args,
            TimeoutPolicy::Tool(HANDLE_SCAN_TIMEOUT),
        )?;

        let holders = parse_handle_output(&output.stdout);
        if holders.is_empty() && !output.success() && !output.stdout.contains("No matching") {
            return Err(ToolError::Failed {
                tool: "handle".to_string(),
                status: output.status.unwrap_or(-1),
                detail: output.summary(),
            }
            .into());
        }

        debug!(target = %target.display(), holders = holders.len(), "handle.exe scan");
        Ok(holders)
    }
}

/// Parse handle.exe listing lines into holders (one per pid)
pub fn parse_handle_output(stdout: &str) -> Vec<LockHolder> {
    let holders = stdout.lines().filter_map(parse_line).map(|h| vec![h]);
    merge_holders(holders)
}

fn parse_line(line: &str) -> Option<LockHolder> {
    let (name, rest) = line.split_once("pid:")?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let mut tokens = rest.split_whitespace();
    let pid: Pid = tokens.next()?.parse().ok()?;

    let holder = LockHolder::new(pid, name, HolderSource::HandleTable);
    let path = rest
        .split_once("type:")
        .and_then(|(_, after)| after.split_once(": "))
        .map(|(_, path)| path.trim())
        .filter(|path| !path.is_empty());

    Some(match path {
        Some(path) => holder.with_path(path),
        None => holder,
    })
}
