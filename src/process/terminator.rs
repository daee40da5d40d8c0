/*!
 * Process Terminator
 *
 * Stops lock holders and their descendants: graceful signal to the whole
 * tree, bounded wait, forced signal to survivors, bounded confirmation.
 *
 * ## Eligibility
 *
 * A terminator is built per call with an explicit set of eligible roots
 * (discovered holders plus, when swept, allow-listed processes). Any other
 * root is refused. Descendants are reachable only through an eligible
 * root. The calling process, its ancestors, and pids below
 * `MIN_SIGNALLABLE_PID` are never signalled.
 */

use super::traits::ProcessTable;
use super::types::*;
use crate::core::limits::{
    DEFAULT_GRACE_PERIOD, EXIT_POLL_INTERVAL, FORCED_CONFIRM_PERIOD, MIN_SIGNALLABLE_PID,
};
use crate::core::retry::RetryPolicy;
use crate::core::types::Pid;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Terminates eligible processes and their descendants
pub struct ProcessTerminator {
    table: Arc<dyn ProcessTable>,
    eligible: HashSet<Pid>,
    grace_period: Duration,
    confirm_period: Duration,
    poll_interval: Duration,
}

impl ProcessTerminator {
    pub fn new(table: Arc<dyn ProcessTable>, eligible: impl IntoIterator<Item = Pid>) -> Self {
        Self {
            table,
            eligible: eligible.into_iter().collect(),
            grace_period: DEFAULT_GRACE_PERIOD,
            confirm_period: FORCED_CONFIRM_PERIOD,
            poll_interval: EXIT_POLL_INTERVAL,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_confirm_period(mut self, confirm_period: Duration) -> Self {
        self.confirm_period = confirm_period;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_eligible(&self, pid: Pid) -> bool {
        self.eligible.contains(&pid)
    }

    /// Terminate one eligible root and its descendants
    pub fn terminate(&self, root: Pid) -> ProcessResult<Vec<Termination>> {
        let snapshot = self.table.snapshot();
        let protected = self.protected_pids(&snapshot);
        self.check_root(root, &protected)?;

        let plan = plan_tree(&snapshot, root, &protected, &mut HashSet::new());
        Ok(self.execute(&plan, &names_of(&snapshot)))
    }

    /// Terminate every given root and its descendants
    ///
    /// One snapshot, one grace period for all trees. Refused roots appear
    /// as failed entries; they never stop the others.
    pub fn terminate_all(&self, roots: &[Pid]) -> Vec<Termination> {
        let snapshot = self.table.snapshot();
        let protected = self.protected_pids(&snapshot);
        let names = names_of(&snapshot);

        let mut refused = Vec::new();
        let mut plan = Vec::new();
        let mut planned = HashSet::new();

        for &root in roots {
            if planned.contains(&root) {
                continue;
            }
            if let Err(e) = self.check_root(root, &protected) {
                warn!(pid = root, error = %e, "refusing to terminate");
                refused.push(Termination {
                    pid: root,
                    name: names.get(&root).cloned().unwrap_or_default(),
                    root,
                    outcome: TerminationOutcome::Failed(e.to_string()),
                });
                planned.insert(root);
                continue;
            }
            plan.extend(plan_tree(&snapshot, root, &protected, &mut planned));
        }

        let mut results = self.execute(&plan, &names);
        results.extend(refused);
        results
    }

    fn check_root(&self, root: Pid, protected: &HashSet<Pid>) -> ProcessResult<()> {
        if root < MIN_SIGNALLABLE_PID || protected.contains(&root) {
            return Err(ProcessError::Protected(root));
        }
        if !self.is_eligible(root) {
            return Err(ProcessError::NotEligible(root));
        }
        Ok(())
    }

    /// Self, every ancestor of self, and the lowest pids
    fn protected_pids(&self, snapshot: &[ProcessInfo]) -> HashSet<Pid> {
        let parents: HashMap<Pid, Option<Pid>> =
            snapshot.iter().map(|p| (p.pid, p.parent)).collect();

        let mut protected: HashSet<Pid> = (0..MIN_SIGNALLABLE_PID).collect();
        let mut cursor = Some(self.table.current_pid());
        while let Some(pid) = cursor {
            if !protected.insert(pid) && pid >= MIN_SIGNALLABLE_PID {
                break;
            }
            cursor = parents.get(&pid).copied().flatten();
        }
        protected
    }

    fn execute(&self, plan: &[(Pid, Pid)], names: &HashMap<Pid, String>) -> Vec<Termination> {
        if plan.is_empty() {
            return Vec::new();
        }

        let mut already_exited = HashSet::new();
        let mut errors: HashMap<Pid, ProcessError> = HashMap::new();

        for &(pid, _) in plan {
            match self.table.signal(pid, Signal::Graceful) {
                Ok(()) => {}
                Err(ProcessError::ProcessNotFound(_)) => {
                    already_exited.insert(pid);
                }
                Err(e) => {
                    debug!(pid, error = %e, "graceful signal failed");
                    errors.insert(pid, e);
                }
            }
        }

        let pending: Vec<Pid> = plan
            .iter()
            .map(|&(pid, _)| pid)
            .filter(|pid| !already_exited.contains(pid))
            .collect();

        RetryPolicy::polling(self.poll_interval, self.grace_period)
            .wait_until(|| pending.iter().all(|&pid| !self.table.is_alive(pid)));

        let survivors: Vec<Pid> = pending
            .iter()
            .copied()
            .filter(|&pid| self.table.is_alive(pid))
            .collect();

        let mut forced = HashSet::new();
        for &pid in &survivors {
            forced.insert(pid);
            match self.table.signal(pid, Signal::Forced) {
                Ok(()) | Err(ProcessError::ProcessNotFound(_)) => {}
                Err(e) => {
                    warn!(pid, error = %e, "forced signal failed");
                    errors.insert(pid, e);
                }
            }
        }

        if !survivors.is_empty() {
            RetryPolicy::polling(self.poll_interval, self.confirm_period)
                .wait_until(|| survivors.iter().all(|&pid| !self.table.is_alive(pid)));
        }

        plan.iter()
            .map(|&(pid, root)| {
                let outcome = if already_exited.contains(&pid) {
                    TerminationOutcome::AlreadyExited
                } else if self.table.is_alive(pid) {
                    let reason = errors
                        .remove(&pid)
                        .unwrap_or(ProcessError::Survived(pid))
                        .to_string();
                    TerminationOutcome::Failed(reason)
                } else if forced.contains(&pid) {
                    TerminationOutcome::Forced
                } else {
                    TerminationOutcome::Graceful
                };

                let name = names.get(&pid).cloned().unwrap_or_default();
                match &outcome {
                    TerminationOutcome::Failed(reason) => {
                        warn!(pid, name = %name, reason = %reason, "process survived termination")
                    }
                    _ => info!(pid, name = %name, ?outcome, "process terminated"),
                }

                Termination {
                    pid,
                    name,
                    root,
                    outcome,
                }
            })
            .collect()
    }
}

fn names_of(snapshot: &[ProcessInfo]) -> HashMap<Pid, String> {
    snapshot.iter().map(|p| (p.pid, p.name.clone())).collect()
}

/// Descendants of `root` children-first, root last, as `(pid, root)` pairs
///
/// Skips protected pids and anything already in `planned`.
fn plan_tree(
    snapshot: &[ProcessInfo],
    root: Pid,
    protected: &HashSet<Pid>,
    planned: &mut HashSet<Pid>,
) -> Vec<(Pid, Pid)> {
    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for process in snapshot {
        if let Some(parent) = process.parent {
            if parent != process.pid {
                children.entry(parent).or_default().push(process.pid);
            }
        }
    }

    let mut order = Vec::new();
    let mut visited = HashSet::new();
    // (pid, children already expanded)
    let mut stack = vec![(root, false)];
    while let Some((pid, expanded)) = stack.pop() {
        if expanded {
            order.push(pid);
            continue;
        }
        if !visited.insert(pid) {
            continue;
        }
        stack.push((pid, true));
        if let Some(kids) = children.get(&pid) {
            for &child in kids {
                if !visited.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
    }

    order
        .into_iter()
        .filter(|pid| !protected.contains(pid))
        .filter(|pid| planned.insert(*pid))
        .map(|pid| (pid, root))
        .collect()
}
