/*!
 * Target Path Handling
 * Normalization, protected system roots, Windows long-path form
 */

use crate::core::errors::{ReclaimError, ReclaimResult};
use crate::core::limits::WINDOWS_MAX_PATH;
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// Absolutize against the current directory and lexically normalize
pub fn normalize(path: &Path) -> ReclaimResult<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(ReclaimError::InvalidTarget("path is empty".to_string()));
    }
    if path.to_string_lossy().contains('\0') {
        return Err(ReclaimError::InvalidTarget(format!(
            "path contains a NUL byte: {}",
            path.display()
        )));
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| {
                ReclaimError::InvalidTarget(format!(
                    "cannot resolve relative path {}: {}",
                    path.display(),
                    e
                ))
            })?
            .join(path)
    };

    Ok(absolute.clean())
}

#[cfg(unix)]
const PROTECTED_ROOTS: &[&str] = &[
    "/", "/bin", "/boot", "/dev", "/etc", "/home", "/lib", "/lib32", "/lib64", "/opt", "/proc",
    "/root", "/run", "/sbin", "/srv", "/sys", "/usr", "/var", "/Users", "/System", "/Library",
    "/Applications",
];

#[cfg(windows)]
const PROTECTED_ROOTS: &[&str] = &[
    r"C:\Windows",
    r"C:\Program Files",
    r"C:\Program Files (x86)",
    r"C:\ProgramData",
    r"C:\Users",
    r"C:\System Volume Information",
];

#[cfg(not(any(unix, windows)))]
const PROTECTED_ROOTS: &[&str] = &[];

/// Whether `path` (already normalized) is a filesystem root, a core system
/// directory, or the current user's home directory
pub fn is_protected(path: &Path) -> bool {
    if is_filesystem_root(path) {
        return true;
    }

    let matches = |candidate: &Path| paths_equal(path, candidate);

    if PROTECTED_ROOTS.iter().any(|root| matches(Path::new(root))) {
        return true;
    }

    ["HOME", "USERPROFILE", "SystemRoot"]
        .iter()
        .filter_map(|key| std::env::var_os(key))
        .any(|value| matches(&PathBuf::from(value).clean()))
}

fn is_filesystem_root(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
}

#[cfg(windows)]
fn paths_equal(a: &Path, b: &Path) -> bool {
    a.to_string_lossy()
        .trim_end_matches('\\')
        .eq_ignore_ascii_case(b.to_string_lossy().trim_end_matches('\\'))
}

#[cfg(not(windows))]
fn paths_equal(a: &Path, b: &Path) -> bool {
    a == b
}

/// `\\?\` form of a Windows path longer than MAX_PATH, if it needs one
pub fn long_path_form(path: &str) -> Option<String> {
    if path.len() <= WINDOWS_MAX_PATH || path.starts_with(r"\\?\") {
        return None;
    }
    match path.strip_prefix(r"\\") {
        Some(unc) => Some(format!(r"\\?\UNC\{}", unc)),
        None => Some(format!(r"\\?\{}", path)),
    }
}

/// Path as handed to host APIs
#[cfg(windows)]
pub fn host_path(path: &Path) -> PathBuf {
    path.to_str()
        .and_then(long_path_form)
        .map(PathBuf::from)
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(not(windows))]
pub fn host_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
