/*!
 * In-memory host for integration tests
 *
 * One shared world backs every capability: a single target that resists
 * removal while a holder is alive or until ownership is escalated.
 */

#![allow(dead_code)]

use force_reclaim::core::errors::{StrategyError, StrategyResult};
use force_reclaim::core::types::{Invasiveness, Pid};
use force_reclaim::deferred::{DeferredRegistrar, RegistrarError, RegistrarResult};
use force_reclaim::privilege::{EscalationReport, OwnershipEscalator};
use force_reclaim::process::{ProcessInfo, ProcessResult, ProcessTable, Signal};
use force_reclaim::scanner::{HandleScanner, HolderSource, LockHolder, ScanResult};
use force_reclaim::strategy::{
    AlternateRemover, Capabilities, DirectoryMirror, Strategy, StrategyContext,
};
use force_reclaim::target::{FileOps, Footprint, NeutralizeReport, TargetKind};
use force_reclaim::{Deadline, TimeoutPolicy};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Pid the fakes report for the test process itself
pub const SELF_PID: Pid = 7;

#[derive(Debug)]
pub struct WorldState {
    pub present: bool,
    pub kind: TargetKind,
    /// pid -> (name, alive)
    pub processes: BTreeMap<Pid, (String, bool)>,
    /// Pids holding the target open
    pub holders: HashSet<Pid>,
    /// Removal refused until escalation ran
    pub foreign_owner: bool,
    pub escalated: bool,
    pub signalled: Vec<(Pid, Signal)>,
    pub removals: usize,
    pub registrations: usize,
}

pub struct World {
    pub state: Mutex<WorldState>,
    pub registrar_accepts: bool,
}

impl World {
    pub fn new(kind: TargetKind) -> Arc<Self> {
        Self::build(kind, true)
    }

    /// World whose registrar refuses every request
    pub fn refusing_registrar(kind: TargetKind) -> Arc<Self> {
        Self::build(kind, false)
    }

    fn build(kind: TargetKind, registrar_accepts: bool) -> Arc<Self> {
        let mut processes = BTreeMap::new();
        processes.insert(1, ("init".to_string(), true));
        processes.insert(SELF_PID, ("reclaim-tests".to_string(), true));
        Arc::new(Self {
            state: Mutex::new(WorldState {
                present: !kind.is_absent(),
                kind,
                processes,
                holders: HashSet::new(),
                foreign_owner: false,
                escalated: false,
                signalled: Vec::new(),
                removals: 0,
                registrations: 0,
            }),
            registrar_accepts,
        })
    }

    /// Add a live process holding the target open
    pub fn hold(&self, pid: Pid, name: &str) {
        let mut state = self.state.lock();
        state.processes.insert(pid, (name.to_string(), true));
        state.holders.insert(pid);
    }

    /// Add a live process unrelated to the target
    pub fn spawn(&self, pid: Pid, name: &str) {
        self.state.lock().processes.insert(pid, (name.to_string(), true));
    }

    pub fn owned_by_someone_else(&self) {
        self.state.lock().foreign_owner = true;
    }

    pub fn is_present(&self) -> bool {
        self.state.lock().present
    }

    pub fn vanish(&self) {
        self.state.lock().present = false;
    }

    pub fn signalled_pids(&self) -> HashSet<Pid> {
        self.state.lock().signalled.iter().map(|(pid, _)| *pid).collect()
    }

    fn live_holders(state: &WorldState) -> Vec<Pid> {
        state
            .holders
            .iter()
            .copied()
            .filter(|pid| state.processes.get(pid).map(|(_, alive)| *alive).unwrap_or(false))
            .collect()
    }

    /// Capability set over this world
    pub fn capabilities(self: &Arc<Self>) -> Capabilities {
        Capabilities {
            files: Arc::new(FakeFiles(self.clone())),
            scanner: Arc::new(FakeScanner(self.clone())),
            processes: Arc::new(FakeProcesses(self.clone())),
            escalator: Arc::new(FakeEscalator(self.clone())),
            remover: Arc::new(Unavailable),
            mirror: Arc::new(Unavailable),
            registrar: Arc::new(FakeRegistrar(self.clone())),
        }
    }
}

pub struct FakeFiles(pub Arc<World>);

impl FileOps for FakeFiles {
    fn kind(&self, _path: &Path) -> TargetKind {
        let state = self.0.state.lock();
        if state.present {
            state.kind
        } else {
            TargetKind::Absent
        }
    }

    fn remove(&self, _path: &Path) -> io::Result<()> {
        let mut state = self.0.state.lock();
        state.removals += 1;
        if !state.present {
            return Ok(());
        }
        if !World::live_holders(&state).is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "The process cannot access the file because it is being used by another process",
            ));
        }
        if state.foreign_owner && !state.escalated {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        state.present = false;
        Ok(())
    }

    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    fn neutralize(&self, _path: &Path) -> io::Result<NeutralizeReport> {
        Ok(NeutralizeReport::default())
    }

    fn measure(&self, _path: &Path) -> Footprint {
        if self.0.state.lock().present {
            Footprint {
                bytes: 4096,
                entries: 3,
            }
        } else {
            Footprint::default()
        }
    }
}

pub struct FakeScanner(pub Arc<World>);

impl HandleScanner for FakeScanner {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn scan(&self, _target: &Path) -> ScanResult<Vec<LockHolder>> {
        let state = self.0.state.lock();
        let mut holders: Vec<LockHolder> = World::live_holders(&state)
            .into_iter()
            .map(|pid| {
                let name = state.processes[&pid].0.clone();
                LockHolder::new(pid, name, HolderSource::HandleTable)
            })
            .collect();
        holders.sort_by_key(|h| h.pid);
        Ok(holders)
    }
}

pub struct FakeProcesses(pub Arc<World>);

impl ProcessTable for FakeProcesses {
    fn snapshot(&self) -> Vec<ProcessInfo> {
        self.0
            .state
            .lock()
            .processes
            .iter()
            .filter(|(_, (_, alive))| *alive)
            .map(|(&pid, (name, _))| {
                let parent = if pid == 1 { None } else { Some(1) };
                ProcessInfo::new(pid, parent, name.clone())
            })
            .collect()
    }

    fn signal(&self, pid: Pid, signal: Signal) -> ProcessResult<()> {
        let mut state = self.0.state.lock();
        state.signalled.push((pid, signal));
        if let Some((_, alive)) = state.processes.get_mut(&pid) {
            *alive = false;
        }
        Ok(())
    }

    fn is_alive(&self, pid: Pid) -> bool {
        self.0
            .state
            .lock()
            .processes
            .get(&pid)
            .map(|(_, alive)| *alive)
            .unwrap_or(false)
    }

    fn current_pid(&self) -> Pid {
        SELF_PID
    }
}

pub struct FakeEscalator(pub Arc<World>);

impl OwnershipEscalator for FakeEscalator {
    fn escalate(&self, _target: &Path, _deadline: Deadline) -> StrategyResult<EscalationReport> {
        self.0.state.lock().escalated = true;
        Ok(EscalationReport {
            ownership_changed: 3,
            access_granted: 3,
            ..Default::default()
        })
    }
}

/// Alternate remover and mirror that are never available
pub struct Unavailable;

impl AlternateRemover for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn remove(&self, _: &Path, _: TargetKind, _: TimeoutPolicy) -> StrategyResult<String> {
        Err(StrategyError::PlatformUnsupported("no alternate remover".into()))
    }
}

impl DirectoryMirror for Unavailable {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn mirror_empty(&self, _: &Path, _: TargetKind, _: TimeoutPolicy) -> StrategyResult<String> {
        Err(StrategyError::PlatformUnsupported("no mirror tool".into()))
    }
}

pub struct FakeRegistrar(pub Arc<World>);

impl DeferredRegistrar for FakeRegistrar {
    fn name(&self) -> &'static str {
        "fake-boot"
    }

    fn register(&self, target: &Path) -> RegistrarResult<String> {
        let mut state = self.0.state.lock();
        state.registrations += 1;
        if self.0.registrar_accepts {
            Ok(format!("{} queued for next start", target.display()))
        } else {
            Err(RegistrarError::PermissionDenied("boot config is read-only".into()))
        }
    }
}

/// What a scripted strategy does when run
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Fail,
    Panic,
    /// Block past any reasonable timeout
    Hang(Duration),
    /// Remove the target through the capability set
    Remove,
    /// Claim success without touching anything
    Lie,
    /// Remove the target, then report an error anyway
    RemoveAndComplain,
}

/// Counts strategies executing at the same time
#[derive(Default)]
pub struct Overlap {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Overlap {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> OverlapGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        OverlapGuard(self.clone())
    }
}

struct OverlapGuard(Arc<Overlap>);

impl Drop for OverlapGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ScriptedStrategy {
    pub name: &'static str,
    pub script: Script,
    pub timeout: Duration,
    pub calls: Arc<AtomicUsize>,
    pub overlap: Option<Arc<Overlap>>,
}

impl ScriptedStrategy {
    pub fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            script,
            timeout: Duration::from_secs(5),
            calls: Arc::new(AtomicUsize::new(0)),
            overlap: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_overlap(mut self, overlap: Arc<Overlap>) -> Self {
        self.overlap = Some(overlap);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn invasiveness(&self) -> Invasiveness {
        Invasiveness::Low
    }

    fn timeout(&self) -> TimeoutPolicy {
        TimeoutPolicy::Strategy(self.timeout)
    }

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _running = self.overlap.as_ref().map(|o| o.enter());
        match self.script {
            Script::Fail => Err(StrategyError::TransientLock(format!("{} failed", self.name))),
            Script::Panic => panic!("{} blew up", self.name),
            Script::Hang(duration) => {
                std::thread::sleep(duration);
                Ok("woke up".into())
            }
            Script::Remove => ctx
                .caps()
                .files
                .remove(ctx.target().path())
                .map(|_| "removed".into())
                .map_err(|e| StrategyError::from_io(e, "scripted remove")),
            Script::Lie => Ok("done, honestly".into()),
            Script::RemoveAndComplain => {
                let _ = ctx.caps().files.remove(ctx.target().path());
                Err(StrategyError::Io("cleanup after removal failed".into()))
            }
        }
    }
}
