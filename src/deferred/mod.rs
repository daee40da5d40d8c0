/*!
 * Deferred-Deletion Registrar
 * Terminal fallback: removal at next system start
 */

#[cfg(target_os = "linux")]
pub mod tmpfiles;
pub mod traits;
#[cfg(windows)]
pub mod windows;

#[cfg(target_os = "linux")]
pub use tmpfiles::TmpfilesRegistrar;
pub use traits::{DeferredRegistrar, RegistrarError, RegistrarResult, UnsupportedRegistrar};
#[cfg(windows)]
pub use windows::MoveFileExRegistrar;

use crate::tools::CommandRunner;
use std::sync::Arc;

/// Registrar for the current platform
pub fn host_registrar(runner: Arc<dyn CommandRunner>) -> Arc<dyn DeferredRegistrar> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(TmpfilesRegistrar::new(runner))
    }
    #[cfg(windows)]
    {
        let _ = runner;
        Arc::new(MoveFileExRegistrar::new())
    }
    #[cfg(not(any(target_os = "linux", windows)))]
    {
        let _ = runner;
        Arc::new(UnsupportedRegistrar)
    }
}
