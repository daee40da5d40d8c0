/*!
 * Termination Allow-List
 *
 * Small, explicit set of host-shell, indexing and security-agent processes
 * known to hold transient locks on user files. Swept only when the
 * configuration opts in.
 */

use super::types::ProcessInfo;
use serde::{Deserialize, Serialize};

#[cfg(target_os = "windows")]
const PLATFORM_DEFAULT: &[&str] = &[
    "explorer.exe",
    "SearchIndexer.exe",
    "SearchProtocolHost.exe",
    "MsMpEng.exe",
    "TiWorker.exe",
];

#[cfg(target_os = "linux")]
const PLATFORM_DEFAULT: &[&str] = &[
    "tracker-miner-fs-3",
    "localsearch-3",
    "baloo_file",
    "baloo_file_extractor",
];

#[cfg(target_os = "macos")]
const PLATFORM_DEFAULT: &[&str] = &["mds", "mds_stores", "mdworker"];

#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
const PLATFORM_DEFAULT: &[&str] = &[];

/// Process names eligible for termination without being discovered as holders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    names: Vec<String>,
}

impl AllowList {
    pub fn new(names: Vec<String>) -> Self {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_by_key(|n| n.to_ascii_lowercase());
        names.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
        Self { names }
    }

    /// The built-in list for the current platform
    pub fn platform_default() -> Self {
        Self::new(PLATFORM_DEFAULT.iter().map(|s| s.to_string()).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Case-insensitive exact name match
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Whether a process matches by name or executable file name
    pub fn matches(&self, process: &ProcessInfo) -> bool {
        if self.contains(&process.name) {
            return true;
        }
        process
            .exe
            .as_deref()
            .and_then(|exe| exe.file_name())
            .and_then(|name| name.to_str())
            .map(|name| self.contains(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
