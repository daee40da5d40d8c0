/*!
 * Process Traits
 * Process-table abstraction used by the terminator and lock scanner
 */

use super::types::*;
use crate::core::types::Pid;

/// Host process table
#[cfg_attr(test, mockall::automock)]
pub trait ProcessTable: Send + Sync {
    /// Enumerate every visible process
    fn snapshot(&self) -> Vec<ProcessInfo>;

    /// Deliver a termination signal
    fn signal(&self, pid: Pid, signal: Signal) -> ProcessResult<()>;

    /// Check whether a process is still running (zombies count as exited)
    fn is_alive(&self, pid: Pid) -> bool;

    /// Pid of the calling process
    fn current_pid(&self) -> Pid {
        std::process::id()
    }
}
