/*!
 * Scanner Traits
 */

use super::types::*;
use std::path::Path;

/// Enumerates processes holding a handle on a path or anything beneath it
#[cfg_attr(test, mockall::automock)]
pub trait HandleScanner: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Read-only scan; `Unsupported` when the host offers no facility
    fn scan(&self, target: &Path) -> ScanResult<Vec<LockHolder>>;
}
