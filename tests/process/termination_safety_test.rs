/*!
 * Termination Safety
 *
 * Nothing outside the discovered holders, the swept allow-list, and their
 * descendants is ever signalled; self, ancestors, and system pids never are.
 */

use crate::fakes::{World, SELF_PID};
use force_reclaim::core::types::Pid;
use force_reclaim::process::{
    AllowList, ProcessInfo, ProcessResult, ProcessTable, ProcessTerminator, Signal,
};
use force_reclaim::strategy::{Strategy as _, StrategyContext, TerminateHolders};
use force_reclaim::{ReclaimConfig, Target, TargetKind, TimeoutPolicy};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Process tree with arbitrary parent links; every signal kills
struct TreeTable {
    processes: Vec<ProcessInfo>,
    me: Pid,
    dead: Mutex<HashSet<Pid>>,
    signalled: Mutex<Vec<Pid>>,
}

impl ProcessTable for TreeTable {
    fn snapshot(&self) -> Vec<ProcessInfo> {
        let dead = self.dead.lock();
        self.processes
            .iter()
            .filter(|p| !dead.contains(&p.pid))
            .cloned()
            .collect()
    }

    fn signal(&self, pid: Pid, _signal: Signal) -> ProcessResult<()> {
        self.signalled.lock().push(pid);
        self.dead.lock().insert(pid);
        Ok(())
    }

    fn is_alive(&self, pid: Pid) -> bool {
        !self.dead.lock().contains(&pid)
    }

    fn current_pid(&self) -> Pid {
        self.me
    }
}

/// Pids 1..=n, each parented to a lower pid
fn arb_tree() -> impl Strategy<Value = Vec<ProcessInfo>> {
    (3usize..40)
        .prop_flat_map(|n| proptest::collection::vec(any::<u32>(), n))
        .prop_map(|seeds| {
            seeds
                .iter()
                .enumerate()
                .map(|(i, seed)| {
                    let pid = i as Pid + 1;
                    let parent = if pid == 1 { None } else { Some(seed % (pid - 1) + 1) };
                    ProcessInfo::new(pid, parent, format!("proc-{}", pid))
                })
                .collect()
        })
}

fn descendants_of(processes: &[ProcessInfo], roots: &HashSet<Pid>) -> HashSet<Pid> {
    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for p in processes {
        if let Some(parent) = p.parent {
            children.entry(parent).or_default().push(p.pid);
        }
    }
    let mut reached: HashSet<Pid> = HashSet::new();
    let mut stack: Vec<Pid> = roots.iter().copied().collect();
    while let Some(pid) = stack.pop() {
        if reached.insert(pid) {
            stack.extend(children.get(&pid).into_iter().flatten().copied());
        }
    }
    reached
}

fn ancestors_of(processes: &[ProcessInfo], pid: Pid) -> HashSet<Pid> {
    let parents: HashMap<Pid, Option<Pid>> =
        processes.iter().map(|p| (p.pid, p.parent)).collect();
    let mut out = HashSet::new();
    let mut cursor = Some(pid);
    while let Some(p) = cursor {
        if !out.insert(p) {
            break;
        }
        cursor = parents.get(&p).copied().flatten();
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(96))]

    #[test]
    fn prop_only_eligible_trees_are_signalled(
        processes in arb_tree(),
        root_picks in proptest::collection::vec(any::<u32>(), 0..6),
        me_pick in any::<u32>(),
    ) {
        let n = processes.len() as u32;
        let me = me_pick % n + 1;
        let roots: Vec<Pid> = root_picks.iter().map(|r| r % (n + 2)).collect();
        let eligible: HashSet<Pid> = roots.iter().copied().collect();

        let table = Arc::new(TreeTable {
            processes: processes.clone(),
            me,
            dead: Mutex::new(HashSet::new()),
            signalled: Mutex::new(Vec::new()),
        });
        let terminator = ProcessTerminator::new(table.clone(), eligible.iter().copied())
            .with_grace_period(Duration::from_millis(5))
            .with_confirm_period(Duration::from_millis(5))
            .with_poll_interval(Duration::from_millis(1));

        let results = terminator.terminate_all(&roots);

        let reachable = descendants_of(&processes, &eligible);
        let protected = ancestors_of(&processes, me);
        let signalled: HashSet<Pid> = table.signalled.lock().iter().copied().collect();

        for pid in &signalled {
            prop_assert!(reachable.contains(pid), "pid {} was not eligible", pid);
            prop_assert!(!protected.contains(pid), "pid {} is self or an ancestor", pid);
            prop_assert!(*pid >= 2, "system pid {} signalled", pid);
        }
        for t in results.iter().filter(|t| t.is_terminated()) {
            prop_assert!(signalled.contains(&t.pid));
        }
    }

    #[test]
    fn prop_strategy_terminates_only_holders_and_swept(
        holders in proptest::collection::hash_set(100u32..120, 0..5),
        bystanders in proptest::collection::hash_set(200u32..220, 0..5),
        sweep in any::<bool>(),
    ) {
        let world = World::new(TargetKind::File);
        for pid in &holders {
            world.hold(*pid, "editor");
        }
        for pid in &bystanders {
            world.spawn(*pid, "bystander");
        }
        world.spawn(300, "indexer");

        let config = ReclaimConfig {
            sweep_allow_list: sweep,
            allow_list: AllowList::new(vec!["indexer".to_string()]),
            ..ReclaimConfig::for_testing()
        };
        let ctx = StrategyContext::new(
            Target::new("/virtual/held", TargetKind::File),
            world.capabilities(),
            &config,
        );
        let _ = TerminateHolders::new(TimeoutPolicy::None).execute(&ctx);

        let mut allowed: HashSet<Pid> = holders.clone();
        if sweep {
            allowed.insert(300);
        }
        let signalled = world.signalled_pids();
        prop_assert!(signalled.is_subset(&allowed));
        prop_assert!(!signalled.contains(&SELF_PID));
        prop_assert!(!signalled.contains(&1));
        prop_assert_eq!(signalled.contains(&300), sweep);
        prop_assert!(holders.iter().all(|pid| signalled.contains(pid)));
    }
}
