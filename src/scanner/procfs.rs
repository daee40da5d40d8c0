/*!
 * procfs Handle Scanner
 *
 * Walks `<proc>/<pid>/fd/<n>`, `cwd`, `exe` and `maps` looking for links
 * that resolve to the target or a path beneath it. Processes we may not
 * inspect are skipped silently; the scan reports what it can see.
 *
 * The kernel reports canonical paths, so the target is matched both as
 * given and with its symlinks resolved.
 */

use super::traits::HandleScanner;
use super::types::*;
use crate::core::limits::PROC_ROOT;
use crate::core::types::Pid;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const DELETED_SUFFIX: &str = " (deleted)";

/// Handle scanner over a procfs mount
#[derive(Debug, Clone)]
pub struct ProcfsScanner {
    proc_root: PathBuf,
    self_pid: Pid,
}

impl ProcfsScanner {
    pub fn new() -> Self {
        Self::with_root(PROC_ROOT)
    }

    /// Scanner over an alternate procfs tree
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            self_pid: std::process::id(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.proc_root.join("self").exists() || self.proc_root.is_dir()
    }

    fn pids(&self) -> ScanResult<Vec<Pid>> {
        let entries = fs::read_dir(&self.proc_root)
            .map_err(|e| ScanError::Unsupported(format!("{}: {}", self.proc_root.display(), e)))?;

        let mut pids: Vec<Pid> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().to_str()?.parse().ok())
            .filter(|pid| *pid != self.self_pid)
            .collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn process_name(&self, dir: &Path) -> String {
        fs::read_to_string(dir.join("comm"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// First way `pid` holds any of the `targets` spellings, if any
    fn inspect(&self, pid: Pid, targets: &[PathBuf]) -> Option<(PathBuf, HolderSource)> {
        let dir = self.proc_root.join(pid.to_string());

        if let Ok(fds) = fs::read_dir(dir.join("fd")) {
            for fd in fds.filter_map(Result::ok) {
                if let Some(link) = read_link(&fd.path()) {
                    if is_within(&link, targets) {
                        return Some((link, HolderSource::HandleTable));
                    }
                }
            }
        }

        if let Some(cwd) = read_link(&dir.join("cwd")) {
            if is_within(&cwd, targets) {
                return Some((cwd, HolderSource::WorkingDirectory));
            }
        }

        if let Some(exe) = read_link(&dir.join("exe")) {
            if is_within(&exe, targets) {
                return Some((exe, HolderSource::MappedImage));
            }
        }

        if let Ok(maps) = fs::read_to_string(dir.join("maps")) {
            if let Some(mapped) = maps
                .lines()
                .filter_map(mapped_path)
                .find(|path| is_within(path, targets))
            {
                return Some((mapped, HolderSource::MappedImage));
            }
        }

        None
    }
}

impl Default for ProcfsScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleScanner for ProcfsScanner {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn scan(&self, target: &Path) -> ScanResult<Vec<LockHolder>> {
        let pids = self.pids()?;
        let targets = target_spellings(target);
        let holders: Vec<LockHolder> = pids
            .into_iter()
            .filter_map(|pid| {
                let (path, source) = self.inspect(pid, &targets)?;
                let dir = self.proc_root.join(pid.to_string());
                trace!(pid, path = %path.display(), ?source, "holder found");
                Some(LockHolder::new(pid, self.process_name(&dir), source).with_path(path))
            })
            .collect();

        debug!(
            target = %target.display(),
            holders = holders.len(),
            "procfs scan complete"
        );
        Ok(holders)
    }
}

fn read_link(path: &Path) -> Option<PathBuf> {
    let link = fs::read_link(path).ok()?;
    let text = link.to_str()?;
    Some(match text.strip_suffix(DELETED_SUFFIX) {
        Some(stripped) => PathBuf::from(stripped),
        None => link,
    })
}

/// Path column of a `/proc/<pid>/maps` line
fn mapped_path(line: &str) -> Option<PathBuf> {
    let path = line.split_whitespace().nth(5)?;
    path.starts_with('/').then(|| PathBuf::from(path))
}

fn is_within(path: &Path, targets: &[PathBuf]) -> bool {
    targets.iter().any(|target| path.starts_with(target))
}

/// The target as given, plus its canonical form when that differs
///
/// A dangling target still gets its parent resolved.
fn target_spellings(target: &Path) -> Vec<PathBuf> {
    let mut spellings = vec![target.to_path_buf()];
    let canonical = fs::canonicalize(target).ok().or_else(|| {
        let parent = fs::canonicalize(target.parent()?).ok()?;
        Some(parent.join(target.file_name()?))
    });
    if let Some(canonical) = canonical {
        if canonical != target {
            spellings.push(canonical);
        }
    }
    spellings
}
