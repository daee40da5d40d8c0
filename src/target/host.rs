/*!
 * Host Filesystem Operations
 * Wraps std::fs and walkdir for target probing and removal
 */

use super::path::host_path;
use super::traits::FileOps;
use super::types::*;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// FileOps over the real filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct HostFileOps;

impl HostFileOps {
    pub fn new() -> Self {
        Self
    }

    fn truncate_file(path: &Path) -> io::Result<u64> {
        let file = OpenOptions::new().write(true).open(path)?;
        let len = file.metadata()?.len();
        file.set_len(0)?;
        file.sync_all()?;
        Ok(len)
    }

    #[cfg(windows)]
    fn remove_link(path: &Path) -> io::Result<()> {
        // Directory symlinks and junctions need RemoveDirectory
        match fs::metadata(path) {
            Ok(md) if md.is_dir() => fs::remove_dir(path),
            _ => fs::remove_file(path),
        }
    }

    #[cfg(not(windows))]
    fn remove_link(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

impl FileOps for HostFileOps {
    fn kind(&self, path: &Path) -> TargetKind {
        match fs::symlink_metadata(host_path(path)) {
            Ok(md) if md.file_type().is_dir() => TargetKind::Directory,
            Ok(_) => TargetKind::File,
            Err(_) => TargetKind::Absent,
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let host = host_path(path);
        let md = match fs::symlink_metadata(&host) {
            Ok(md) => md,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let result = if md.file_type().is_dir() {
            fs::remove_dir_all(&host)
        } else if md.file_type().is_symlink() {
            Self::remove_link(&host)
        } else {
            fs::remove_file(&host)
        };

        match result {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => {
                debug!(path = %path.display(), ok = other.is_ok(), "remove");
                other
            }
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(host_path(from), host_path(to))
    }

    fn neutralize(&self, path: &Path) -> io::Result<NeutralizeReport> {
        let mut report = NeutralizeReport::default();
        let mut last_error = None;

        for entry in WalkDir::new(host_path(path)).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.failed += 1;
                    last_error = e.into_io_error();
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match Self::truncate_file(entry.path()) {
                Ok(len) => {
                    report.truncated += 1;
                    report.bytes_released += len;
                }
                Err(e) => {
                    trace!(path = %entry.path().display(), error = %e, "truncate failed");
                    report.failed += 1;
                    last_error = Some(e);
                }
            }
        }

        // Nothing could be touched at all: surface the cause
        if report.truncated == 0 && report.failed > 0 {
            return Err(last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "neutralize failed")));
        }
        Ok(report)
    }

    fn measure(&self, path: &Path) -> Footprint {
        WalkDir::new(host_path(path))
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
            .fold(Footprint::default(), |mut acc, entry| {
                acc.entries += 1;
                if entry.file_type().is_file() {
                    acc.bytes += entry.metadata().map(|md| md.len()).unwrap_or(0);
                }
                acc
            })
    }
}
