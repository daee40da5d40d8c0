/*!
 * Lock Scanner
 * Discovers processes holding the target open
 */

pub mod composite;
pub mod handle;
pub mod heuristic;
#[cfg(target_os = "linux")]
pub mod procfs;
pub mod traits;
pub mod types;

pub use composite::LockScanner;
pub use handle::HandleExeScanner;
pub use heuristic::NameHeuristicScanner;
#[cfg(target_os = "linux")]
pub use procfs::ProcfsScanner;
pub use traits::HandleScanner;
pub use types::{merge_holders, HolderSource, LockHolder, ScanError, ScanResult};
