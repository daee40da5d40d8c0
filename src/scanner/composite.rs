/*!
 * Lock Scanner
 *
 * Combines the host's handle-enumeration backends (and, when opted in,
 * the name heuristic) into one ordered, pid-unique holder set. Never
 * fails: a backend that is unsupported or errors contributes nothing and
 * the session moves on.
 */

use super::heuristic::NameHeuristicScanner;
use super::traits::HandleScanner;
use super::types::*;
use crate::process::ProcessTable;
use crate::tools::CommandRunner;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct LockScanner {
    backends: Vec<Arc<dyn HandleScanner>>,
}

impl LockScanner {
    pub fn new(backends: Vec<Arc<dyn HandleScanner>>) -> Self {
        Self { backends }
    }

    /// Scanner with no backends; every scan is empty
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Backends available on this host
    pub fn for_host(
        table: Arc<dyn ProcessTable>,
        runner: Arc<dyn CommandRunner>,
        name_heuristic: bool,
    ) -> Self {
        let mut backends: Vec<Arc<dyn HandleScanner>> = Vec::new();

        #[cfg(target_os = "linux")]
        {
            let procfs = super::procfs::ProcfsScanner::new();
            if procfs.is_available() {
                backends.push(Arc::new(procfs));
            }
        }

        #[cfg(windows)]
        {
            if let Some(handle) = super::handle::HandleExeScanner::discover(runner.clone()) {
                backends.push(Arc::new(handle));
            }
        }

        #[cfg(not(windows))]
        let _ = &runner;

        if name_heuristic {
            backends.push(Arc::new(NameHeuristicScanner::new(table)));
        }

        let names: Vec<&str> = backends.iter().map(|b| b.name()).collect();
        debug!(?names, "lock scanner backends");
        Self::new(backends)
    }

    /// Holders of `target`; empty when nothing can be enumerated
    pub fn holders(&self, target: &Path) -> Vec<LockHolder> {
        if self.backends.is_empty() {
            warn!("no handle enumeration facility on this host; assuming no holders");
            return Vec::new();
        }

        let sets = self.backends.iter().filter_map(|backend| {
            match backend.scan(target) {
                Ok(holders) => Some(holders),
                Err(ScanError::Unsupported(reason)) => {
                    warn!(backend = backend.name(), %reason, "scanner unsupported, skipping");
                    None
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "scanner failed, skipping");
                    None
                }
            }
        });
        merge_holders(sets.collect::<Vec<_>>())
    }
}

impl HandleScanner for LockScanner {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn scan(&self, target: &Path) -> ScanResult<Vec<LockHolder>> {
        Ok(self.holders(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::traits::MockHandleScanner;

    fn backend(result: ScanResult<Vec<LockHolder>>) -> Arc<dyn HandleScanner> {
        let mut mock = MockHandleScanner::new();
        mock.expect_name().return_const("mock");
        mock.expect_scan().returning(move |_| result.clone());
        Arc::new(mock)
    }

    #[test]
    fn test_unsupported_degrades_to_empty() {
        let scanner = LockScanner::new(vec![backend(Err(ScanError::Unsupported(
            "no procfs".into(),
        )))]);
        assert!(scanner.scan(Path::new("/x")).unwrap().is_empty());
        assert!(LockScanner::empty().holders(Path::new("/x")).is_empty());
    }

    #[test]
    fn test_failed_backend_does_not_hide_others() {
        let scanner = LockScanner::new(vec![
            backend(Err(ScanError::Failed("boom".into()))),
            backend(Ok(vec![LockHolder::new(7, "vim", HolderSource::HandleTable)])),
            backend(Ok(vec![LockHolder::new(7, "vim", HolderSource::NameHeuristic)])),
        ]);
        let holders = scanner.holders(Path::new("/x"));
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].source, HolderSource::HandleTable);
    }
}
