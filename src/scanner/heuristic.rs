/*!
 * Name Heuristic Scanner
 *
 * Opt-in broadening: reports processes whose executable name or any
 * command-line argument contains the target's leaf name. Catches holders
 * that handle enumeration misses at the cost of false positives, so it is
 * never enabled by default and refuses leaf names too short to be
 * distinctive.
 */

use super::traits::HandleScanner;
use super::types::*;
use crate::core::limits::MIN_HEURISTIC_LEAF_LEN;
use crate::process::{ProcessInfo, ProcessTable};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub struct NameHeuristicScanner {
    table: Arc<dyn ProcessTable>,
}

impl NameHeuristicScanner {
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        Self { table }
    }
}

impl HandleScanner for NameHeuristicScanner {
    fn name(&self) -> &'static str {
        "name-heuristic"
    }

    fn scan(&self, target: &Path) -> ScanResult<Vec<LockHolder>> {
        let leaf = match target.file_name().and_then(|n| n.to_str()) {
            Some(leaf) if leaf.chars().count() >= MIN_HEURISTIC_LEAF_LEN => leaf.to_lowercase(),
            _ => return Ok(Vec::new()),
        };

        let me = self.table.current_pid();
        let holders: Vec<LockHolder> = self
            .table
            .snapshot()
            .into_iter()
            .filter(|p| p.pid != me && references(p, &leaf))
            .map(|p| LockHolder::new(p.pid, p.name, HolderSource::NameHeuristic))
            .collect();

        debug!(leaf = %leaf, matches = holders.len(), "name heuristic scan");
        Ok(holders)
    }
}

fn references(process: &ProcessInfo, leaf: &str) -> bool {
    let exe_name = process
        .exe
        .as_deref()
        .and_then(|exe| exe.file_name())
        .map(|n| n.to_string_lossy().to_lowercase());

    process.name.to_lowercase().contains(leaf)
        || exe_name.map(|n| n.contains(leaf)).unwrap_or(false)
        || process.cmd.iter().any(|arg| arg.to_lowercase().contains(leaf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::traits::MockProcessTable;

    fn scanner() -> NameHeuristicScanner {
        let mut table = MockProcessTable::new();
        table.expect_current_pid().return_const(1000u32);
        table.expect_snapshot().returning(|| {
            vec![
                ProcessInfo::new(10, Some(1), "ProjectX-Server"),
                ProcessInfo::new(11, Some(1), "python3")
                    .with_cmd(vec!["python3".into(), "/srv/projectx/run.py".into()]),
                ProcessInfo::new(12, Some(1), "bash"),
                ProcessInfo::new(1000, Some(1), "reclaim")
                    .with_cmd(vec!["reclaim".into(), "/srv/projectx".into()]),
            ]
        });
        NameHeuristicScanner::new(Arc::new(table))
    }

    #[test]
    fn test_matches_name_and_cmdline_but_never_self() {
        let holders = scanner().scan(Path::new("/srv/projectx")).unwrap();
        let pids: Vec<u32> = holders.iter().map(|h| h.pid).collect();
        assert_eq!(pids, vec![10, 11]);
        assert!(holders
            .iter()
            .all(|h| h.source == HolderSource::NameHeuristic));
    }

    #[test]
    fn test_short_leaf_never_matches() {
        let mut table = MockProcessTable::new();
        table.expect_snapshot().never();
        table.expect_current_pid().never();
        let scanner = NameHeuristicScanner::new(Arc::new(table));
        assert!(scanner.scan(Path::new("/srv/x")).unwrap().is_empty());
    }
}
