/*!
 * Privilege Escalator
 * Ownership takeover, access grants, attribute clearing, elevation check
 */

pub mod elevation;
pub mod traits;
pub mod types;
#[cfg(unix)]
pub mod unix;
pub mod windows;

pub use elevation::is_elevated;
pub use traits::OwnershipEscalator;
pub use types::EscalationReport;
#[cfg(unix)]
pub use unix::UnixOwnershipEscalator;
pub use windows::WindowsOwnershipEscalator;

use crate::tools::CommandRunner;
use std::sync::Arc;

/// Escalator for the current platform
pub fn host_escalator(runner: Arc<dyn CommandRunner>) -> Arc<dyn OwnershipEscalator> {
    #[cfg(unix)]
    {
        Arc::new(UnixOwnershipEscalator::new(runner))
    }
    #[cfg(not(unix))]
    {
        Arc::new(WindowsOwnershipEscalator::new(runner))
    }
}
