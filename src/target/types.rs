/*!
 * Target Types
 */

use crate::core::serde::pathbuf_string;
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What currently sits at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    File,
    Directory,
    Absent,
}

impl TargetKind {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resource under reclamation
///
/// `kind` is what was observed when the session started. Current state is
/// always re-read through `FileOps`, never read from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(with = "pathbuf_string")]
    path: PathBuf,
    kind: TargetKind,
}

impl Target {
    pub fn new(path: impl Into<PathBuf>, kind: TargetKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind observed at session start
    pub fn initial_kind(&self) -> TargetKind {
        self.kind
    }
}

/// Size and entry count of a target tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footprint {
    pub bytes: Size,
    pub entries: u64,
}

/// Result of truncating a target's files in place
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeutralizeReport {
    pub truncated: u64,
    pub failed: u64,
    pub bytes_released: Size,
}
