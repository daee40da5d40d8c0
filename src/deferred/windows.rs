/*!
 * MoveFileEx Registrar
 *
 * Queues `MOVEFILE_DELAY_UNTIL_REBOOT` deletions with a null destination.
 * Directories can only be removed at boot once empty, so a tree is
 * registered bottom-up: children first, the root last.
 */

use super::traits::*;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;
use windows_sys::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_DELAY_UNTIL_REBOOT};

#[derive(Debug, Default, Clone, Copy)]
pub struct MoveFileExRegistrar;

impl MoveFileExRegistrar {
    pub fn new() -> Self {
        Self
    }

    fn schedule(path: &Path) -> std::io::Result<()> {
        let host = crate::target::host_path(path);
        let wide: Vec<u16> = host
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        // SAFETY: `wide` is NUL-terminated and outlives the call; a null
        // destination requests deletion
        let ok = unsafe { MoveFileExW(wide.as_ptr(), std::ptr::null(), MOVEFILE_DELAY_UNTIL_REBOOT) };
        if ok == 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl DeferredRegistrar for MoveFileExRegistrar {
    fn name(&self) -> &'static str {
        "MoveFileEx"
    }

    fn register(&self, target: &Path) -> RegistrarResult<String> {
        let mut scheduled = 0u64;
        let mut failed = 0u64;

        for entry in WalkDir::new(target).follow_links(false).contents_first(true) {
            let Ok(entry) = entry else {
                failed += 1;
                continue;
            };
            if entry.path() == target {
                continue;
            }
            match Self::schedule(entry.path()) {
                Ok(()) => scheduled += 1,
                Err(e) => {
                    debug!(path = %entry.path().display(), error = %e, "boot-time removal refused");
                    failed += 1;
                }
            }
        }

        // The root decides acceptance
        Self::schedule(target)
            .map_err(|e| RegistrarError::from_io(e, format!("MoveFileEx {}", target.display())))?;
        scheduled += 1;

        info!(target = %target.display(), scheduled, failed, "registered for boot-time removal");
        Ok(format!(
            "{} entries queued for removal at next restart ({} refused)",
            scheduled, failed
        ))
    }
}
