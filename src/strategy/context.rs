/*!
 * Strategy Context
 *
 * Everything a strategy may touch: the target, the host capability set,
 * the shared retry policy, and an effect log through which strategies
 * report terminated holders and escalation back to the session.
 *
 * The orchestrator arms one absolute deadline per attempt. Tool runs and
 * retry loops inside the strategy draw on what is left of it.
 */

use super::mirror::{DirectoryMirror, SyncMirror};
use super::shell::{AlternateRemover, ShellRemover};
use crate::core::config::ReclaimConfig;
use crate::core::errors::{StrategyError, StrategyResult};
use crate::core::limits::TOOL_DEADLINE_MARGIN;
use crate::core::retry::RetryPolicy;
use crate::core::timeout::{Deadline, TimeoutPolicy};
use crate::deferred::{host_registrar, DeferredRegistrar};
use crate::privilege::{host_escalator, OwnershipEscalator};
use crate::process::{AllowList, HostProcessTable, ProcessTable, Termination};
use crate::scanner::{HandleScanner, LockScanner};
use crate::target::{FileOps, HostFileOps, Target, TargetKind};
use crate::tools::{CommandRunner, HostCommandRunner};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Host capability set; every member is an interface
#[derive(Clone)]
pub struct Capabilities {
    pub files: Arc<dyn FileOps>,
    pub scanner: Arc<dyn HandleScanner>,
    pub processes: Arc<dyn ProcessTable>,
    pub escalator: Arc<dyn OwnershipEscalator>,
    pub remover: Arc<dyn AlternateRemover>,
    pub mirror: Arc<dyn DirectoryMirror>,
    pub registrar: Arc<dyn DeferredRegistrar>,
}

impl Capabilities {
    /// Native implementations for the current platform
    pub fn host(config: &ReclaimConfig) -> Self {
        let runner: Arc<dyn CommandRunner> = Arc::new(HostCommandRunner::new());
        let processes: Arc<dyn ProcessTable> = Arc::new(HostProcessTable::new());

        Self {
            files: Arc::new(HostFileOps::new()),
            scanner: Arc::new(LockScanner::for_host(
                processes.clone(),
                runner.clone(),
                config.name_heuristic,
            )),
            processes,
            escalator: host_escalator(runner.clone()),
            remover: Arc::new(ShellRemover::new(runner.clone())),
            mirror: Arc::new(SyncMirror::new(runner.clone())),
            registrar: host_registrar(runner),
        }
    }
}

/// Side effects a session reports beyond the attempt list
#[derive(Debug, Clone, Default)]
pub struct Effects {
    pub terminated: Vec<Termination>,
    pub escalated: bool,
    /// Throwaway path left behind by a failed rename rollback
    pub residue: Option<PathBuf>,
}

/// Per-session context handed to every strategy
pub struct StrategyContext {
    target: Target,
    caps: Capabilities,
    retry: RetryPolicy,
    grace_period: Duration,
    allow_list: AllowList,
    sweep_allow_list: bool,
    deadline: Mutex<Deadline>,
    effects: Mutex<Effects>,
}

impl StrategyContext {
    pub fn new(target: Target, caps: Capabilities, config: &ReclaimConfig) -> Self {
        Self {
            target,
            caps,
            retry: config.removal_retry,
            grace_period: config.grace_period,
            allow_list: config.allow_list.clone(),
            sweep_allow_list: config.sweep_allow_list,
            deadline: Mutex::new(Deadline::unbounded()),
            effects: Mutex::new(Effects::default()),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Arm the deadline for the next strategy attempt
    pub fn begin_attempt(&self, timeout: TimeoutPolicy) {
        *self.deadline.lock() = Deadline::after(timeout);
    }

    /// Deadline of the running attempt; unbounded outside the orchestrator
    pub fn deadline(&self) -> Deadline {
        *self.deadline.lock()
    }

    /// Bound for the next external tool of the running attempt
    pub fn tool_budget(&self) -> TimeoutPolicy {
        self.deadline().tool_budget(TOOL_DEADLINE_MARGIN)
    }

    /// Allow-list to sweep, if the sweep is enabled
    pub fn sweep(&self) -> Option<&AllowList> {
        self.sweep_allow_list.then_some(&self.allow_list)
    }

    /// Current kind at the original path
    pub fn current_kind(&self) -> TargetKind {
        self.caps.files.kind(self.target.path())
    }

    /// Remove the target, retrying transient failures under the shared policy
    pub fn remove_with_retry(&self) -> StrategyResult<()> {
        let path = self.target.path();
        let retry = match (self.deadline().remaining(), self.retry.deadline().duration()) {
            (Some(left), Some(own)) if own <= left => self.retry,
            (Some(left), _) => self.retry.with_deadline(TimeoutPolicy::Wait(left)),
            (None, _) => self.retry,
        };
        retry.execute(
            |_| {
                self.caps
                    .files
                    .remove(path)
                    .map_err(|e| StrategyError::from_io(e, format!("remove {}", path.display())))
            },
            |e| matches!(e, StrategyError::TransientLock(_) | StrategyError::Io(_)),
        )
    }

    pub fn record_terminations(&self, terminations: Vec<Termination>) {
        self.effects.lock().terminated.extend(terminations);
    }

    pub fn mark_escalated(&self) {
        self.effects.lock().escalated = true;
    }

    pub fn record_residue(&self, residue: PathBuf) {
        self.effects.lock().residue = Some(residue);
    }

    /// Snapshot of the effects recorded so far
    pub fn effects(&self) -> Effects {
        self.effects.lock().clone()
    }
}
