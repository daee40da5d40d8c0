/*!
 * Host Process Table
 * sysinfo enumeration, nix signals on Unix
 */

use super::traits::ProcessTable;
use super::types::*;
use crate::core::types::Pid;
use sysinfo::{ProcessRefreshKind, RefreshKind, System};
use tracing::{debug, warn};

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{kill, Signal as UnixSignal};
#[cfg(unix)]
use nix::unistd::Pid as NixPid;

/// Process table backed by the host OS
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProcessTable;

impl HostProcessTable {
    pub fn new() -> Self {
        Self
    }

    fn load() -> System {
        System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::everything()),
        )
    }
}

impl ProcessTable for HostProcessTable {
    fn snapshot(&self) -> Vec<ProcessInfo> {
        let system = Self::load();
        let processes: Vec<ProcessInfo> = system
            .processes()
            .iter()
            .map(|(pid, process)| ProcessInfo {
                pid: pid.as_u32(),
                parent: process.parent().map(|p| p.as_u32()),
                name: process.name().to_string_lossy().into_owned(),
                exe: process.exe().map(|p| p.to_path_buf()),
                cmd: process
                    .cmd()
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
            })
            .collect();
        debug!(count = processes.len(), "process table snapshot");
        processes
    }

    #[cfg(unix)]
    fn signal(&self, pid: Pid, signal: Signal) -> ProcessResult<()> {
        let unix_signal = match signal {
            Signal::Graceful => UnixSignal::SIGTERM,
            Signal::Forced => UnixSignal::SIGKILL,
        };

        match kill(NixPid::from_raw(pid as i32), unix_signal) {
            Ok(()) => {
                debug!(pid, ?signal, "signal delivered");
                Ok(())
            }
            Err(Errno::ESRCH) => Err(ProcessError::ProcessNotFound(pid)),
            Err(Errno::EPERM) => Err(ProcessError::PermissionDenied(pid)),
            Err(e) => {
                warn!(pid, ?signal, error = %e, "signal failed");
                Err(ProcessError::SignalFailed {
                    pid,
                    reason: e.to_string(),
                })
            }
        }
    }

    #[cfg(not(unix))]
    fn signal(&self, pid: Pid, signal: Signal) -> ProcessResult<()> {
        let system = Self::load();
        let process = system
            .process(sysinfo::Pid::from_u32(pid))
            .ok_or(ProcessError::ProcessNotFound(pid))?;

        // Graceful termination has no portable equivalent here; fall back to kill
        let delivered = match signal {
            Signal::Graceful => process
                .kill_with(sysinfo::Signal::Term)
                .unwrap_or_else(|| process.kill()),
            Signal::Forced => process.kill(),
        };

        if delivered {
            debug!(pid, ?signal, "signal delivered");
            Ok(())
        } else {
            Err(ProcessError::SignalFailed {
                pid,
                reason: "termination request was rejected".to_string(),
            })
        }
    }

    #[cfg(unix)]
    fn is_alive(&self, pid: Pid) -> bool {
        match kill(NixPid::from_raw(pid as i32), None) {
            Ok(()) | Err(Errno::EPERM) => !is_zombie(pid),
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    fn is_alive(&self, pid: Pid) -> bool {
        let system = System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::new()),
        );
        system.process(sysinfo::Pid::from_u32(pid)).is_some()
    }
}

/// Zombies hold no file handles and cannot be signalled away
#[cfg(target_os = "linux")]
fn is_zombie(pid: Pid) -> bool {
    let path = format!("{}/{}/stat", crate::core::limits::PROC_ROOT, pid);
    let stat = match std::fs::read_to_string(path) {
        Ok(stat) => stat,
        Err(_) => return false,
    };
    parse_stat_state(&stat)
        .map(|state| state == 'Z' || state == 'X')
        .unwrap_or(false)
}

#[cfg(all(unix, not(target_os = "linux")))]
fn is_zombie(pid: Pid) -> bool {
    let system = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new()),
    );
    system
        .process(sysinfo::Pid::from_u32(pid))
        .map(|p| matches!(p.status(), sysinfo::ProcessStatus::Zombie))
        .unwrap_or(false)
}

/// State character from `/proc/<pid>/stat` (the field after the command)
#[cfg(any(target_os = "linux", test))]
fn parse_stat_state(stat: &str) -> Option<char> {
    let after_comm = &stat[stat.rfind(')')? + 1..];
    after_comm.trim_start().chars().next()
}
