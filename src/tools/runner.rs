/*!
 * External Tool Runner
 * Spawns one host tool with captured output and a hard deadline
 *
 * On Unix the tool leads its own process group, so a timeout kills
 * everything it started. Output collection is bounded as well: a
 * descendant that inherits the pipes and outlives the tool cannot keep
 * the runner waiting.
 */

use super::types::*;
use crate::core::limits::{EXIT_POLL_INTERVAL, OUTPUT_DRAIN_TIMEOUT};
use crate::core::retry::RetryPolicy;
use crate::core::timeout::TimeoutPolicy;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Spawns external tools
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner: Send + Sync {
    /// Resolve a tool name on PATH
    fn locate(&self, tool: &str) -> Option<PathBuf>;

    /// Run `program` to completion or until `deadline`, killing it on expiry
    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        deadline: TimeoutPolicy,
    ) -> ToolResult<ToolOutput>;
}

/// Locate `tool`, run it, and treat a non-zero exit as failure
pub fn run_tool(
    runner: &dyn CommandRunner,
    tool: &str,
    args: &[OsString],
    deadline: TimeoutPolicy,
) -> ToolResult<ToolOutput> {
    validate_tool_name(tool)?;
    let program = runner
        .locate(tool)
        .ok_or_else(|| ToolError::NotFound(tool.to_string()))?;

    if deadline.duration() == Some(Duration::ZERO) {
        return Err(ToolError::TimedOut {
            tool: tool.to_string(),
            elapsed_ms: 0,
            limit_ms: 0,
        });
    }

    let output = runner.run(&program, args, deadline)?;
    if output.success() {
        Ok(output)
    } else {
        Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.unwrap_or(-1),
            detail: output.summary(),
        })
    }
}

/// Tool names are fixed identifiers, never paths or shell fragments
fn validate_tool_name(tool: &str) -> ToolResult<()> {
    if tool.trim().is_empty() {
        return Err(ToolError::InvalidTool("empty tool name".to_string()));
    }

    let dangerous_chars = [';', '|', '&', '\n', '\r', '\0', '`', '$', '(', ')', '/', '\\'];
    if dangerous_chars.iter().any(|&c| tool.contains(c)) || tool.contains("..") {
        return Err(ToolError::InvalidTool(tool.to_string()));
    }
    Ok(())
}

/// Runs tools as child processes of the engine
#[derive(Debug, Default, Clone, Copy)]
pub struct HostCommandRunner;

impl HostCommandRunner {
    pub fn new() -> Self {
        Self
    }

    fn drain<R: Read + Send + 'static>(source: Option<R>) -> Option<Receiver<String>> {
        source.map(|mut source| {
            let (tx, rx) = mpsc::channel();
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = source.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            });
            rx
        })
    }

    /// Drained text, or None while the pipe is still held open
    fn collect(stream: Option<&Receiver<String>>, wait: Duration) -> Option<String> {
        match stream.map(|rx| rx.recv_timeout(wait)) {
            None | Some(Err(RecvTimeoutError::Disconnected)) => Some(String::new()),
            Some(Ok(text)) => Some(text),
            Some(Err(RecvTimeoutError::Timeout)) => None,
        }
    }

    /// Kill the tool's whole process group; the tool itself may be gone
    #[cfg(unix)]
    fn kill_group(leader: u32, tool: &str) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(leader as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => warn!(tool, error = %e, "failed to kill tool process group"),
        }
    }

    #[cfg(not(unix))]
    fn kill_group(_leader: u32, _tool: &str) {}

    fn kill(child: &mut Child, tool: &str) {
        Self::kill_group(child.id(), tool);
        if let Err(e) = child.kill() {
            warn!(tool, error = %e, "failed to kill timed-out tool");
        }
        let _ = child.wait();
    }
}

impl CommandRunner for HostCommandRunner {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }

    fn run(
        &self,
        program: &Path,
        args: &[OsString],
        deadline: TimeoutPolicy,
    ) -> ToolResult<ToolOutput> {
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());

        let start = Instant::now();
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command
            .spawn()
            .map_err(|e| ToolError::SpawnFailed {
                tool: tool.clone(),
                reason: e.to_string(),
            })?;

        debug!(tool = %tool, os_pid = child.id(), ?args, "tool started");

        let stdout = Self::drain(child.stdout.take());
        let stderr = Self::drain(child.stderr.take());

        let mut status = None;
        let mut wait_error = None;
        RetryPolicy::new(u32::MAX, EXIT_POLL_INTERVAL)
            .with_max_backoff(EXIT_POLL_INTERVAL)
            .with_deadline(deadline)
            .wait_until(|| match child.try_wait() {
                Ok(Some(exit)) => {
                    status = Some(exit);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    wait_error = Some(e);
                    true
                }
            });

        if let Some(e) = wait_error {
            Self::kill(&mut child, &tool);
            return Err(ToolError::SpawnFailed {
                tool,
                reason: e.to_string(),
            });
        }

        let Some(exit) = status else {
            Self::kill(&mut child, &tool);
            let elapsed_ms = start.elapsed().as_millis() as u64;
            warn!(tool = %tool, elapsed_ms, "tool exceeded its deadline");
            return Err(ToolError::TimedOut {
                tool,
                elapsed_ms,
                limit_ms: deadline
                    .duration()
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0),
            });
        };

        let drain_by = Instant::now() + OUTPUT_DRAIN_TIMEOUT;
        let left = || drain_by.saturating_duration_since(Instant::now());
        let mut out = Self::collect(stdout.as_ref(), left());
        let mut err = Self::collect(stderr.as_ref(), left());
        if out.is_none() || err.is_none() {
            warn!(tool = %tool, "descendants of the tool still hold its output; killing them");
            Self::kill_group(child.id(), &tool);
            out = out.or_else(|| Self::collect(stdout.as_ref(), EXIT_POLL_INTERVAL * 10));
            err = err.or_else(|| Self::collect(stderr.as_ref(), EXIT_POLL_INTERVAL * 10));
        }

        let output = ToolOutput {
            status: exit.code(),
            stdout: out.unwrap_or_default(),
            stderr: err.unwrap_or_default(),
            elapsed: start.elapsed(),
        };

        info!(
            tool = %tool,
            status = ?output.status,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "tool finished"
        );
        Ok(output)
    }
}
