/*!
 * File Operation Traits
 */

use super::types::*;
use std::io;
use std::path::Path;

/// Host filesystem primitives used by the Target Model and the strategies
///
/// Every call re-reads the filesystem; nothing is cached.
#[cfg_attr(test, mockall::automock)]
pub trait FileOps: Send + Sync {
    /// What currently sits at `path` (symlinks are not followed)
    fn kind(&self, path: &Path) -> TargetKind;

    fn exists(&self, path: &Path) -> bool {
        !self.kind(path).is_absent()
    }

    /// Recursively remove whatever sits at `path`; absent is success
    fn remove(&self, path: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Truncate every regular file at or beneath `path` to zero bytes
    fn neutralize(&self, path: &Path) -> io::Result<NeutralizeReport>;

    /// Total size and entry count at or beneath `path`
    fn measure(&self, path: &Path) -> Footprint;
}
