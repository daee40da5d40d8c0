/*!
 * systemd-tmpfiles Registrar
 *
 * Appends a boot-only recursive removal entry (`R!`) for the target to a
 * tmpfiles.d fragment owned by this engine. The fragment also carries an
 * `r!` entry for itself, so it disappears after the boot that honors it.
 *
 * The fragment is rewritten through a temp file and rename, so a crash
 * never leaves a half-written entry behind. Path bytes that are not valid
 * UTF-8 are written as `\xNN` escapes, which tmpfiles decodes back to the
 * raw bytes.
 */

use super::traits::*;
use crate::core::limits::{TMPFILES_CONF_NAME, TMPFILES_DIR};
use crate::tools::CommandRunner;
use std::fs;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const HEADER: &str = "# Boot-time removals registered by force-reclaim\n";

pub struct TmpfilesRegistrar {
    conf_dir: PathBuf,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl TmpfilesRegistrar {
    /// Registrar writing to /etc/tmpfiles.d, available only with systemd-tmpfiles
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            conf_dir: PathBuf::from(TMPFILES_DIR),
            runner: Some(runner),
        }
    }

    /// Registrar writing to an arbitrary directory, skipping the tool check
    pub fn with_dir(conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            conf_dir: conf_dir.into(),
            runner: None,
        }
    }

    pub fn conf_path(&self) -> PathBuf {
        self.conf_dir.join(TMPFILES_CONF_NAME)
    }

    fn write_atomically(&self, contents: &str) -> RegistrarResult<()> {
        let conf = self.conf_path();
        let mut tmp = NamedTempFile::new_in(&self.conf_dir).map_err(|e| {
            RegistrarError::from_io(e, format!("create in {}", self.conf_dir.display()))
        })?;
        tmp.write_all(contents.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| RegistrarError::from_io(e, "write tmpfiles fragment"))?;
        tmp.persist(&conf)
            .map_err(|e| RegistrarError::from_io(e.error, format!("replace {}", conf.display())))?;
        Ok(())
    }
}

/// One tmpfiles.d line
pub fn entry_line(kind: &str, path: &Path) -> String {
    format!("{} {}", kind, quote(path))
}

/// Double-quoted, C-escaped, with `%` specifiers neutralized
fn quote(path: &Path) -> String {
    let mut quoted = String::with_capacity(path.as_os_str().len() + 2);
    quoted.push('"');

    let mut rest = path.as_os_str().as_bytes();
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                escape_text(valid, &mut quoted);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                escape_text(std::str::from_utf8(valid).unwrap_or_default(), &mut quoted);
                let invalid = e.error_len().unwrap_or(after.len());
                for byte in &after[..invalid] {
                    escape_byte(*byte, &mut quoted);
                }
                rest = &after[invalid..];
            }
        }
    }

    quoted.push('"');
    quoted
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("%%"),
            c if c.is_ascii_control() => escape_byte(c as u8, out),
            c => out.push(c),
        }
    }
}

fn escape_byte(byte: u8, out: &mut String) {
    out.push_str(&format!("\\x{:02x}", byte));
}

impl DeferredRegistrar for TmpfilesRegistrar {
    fn name(&self) -> &'static str {
        "systemd-tmpfiles"
    }

    fn register(&self, target: &Path) -> RegistrarResult<String> {
        if let Some(runner) = &self.runner {
            if runner.locate("systemd-tmpfiles").is_none() {
                return Err(RegistrarError::Unsupported(
                    "systemd-tmpfiles is not installed".to_string(),
                ));
            }
        }
        if !self.conf_dir.is_dir() {
            return Err(RegistrarError::Unsupported(format!(
                "{} does not exist",
                self.conf_dir.display()
            )));
        }

        let conf = self.conf_path();
        let existing = match fs::read_to_string(&conf) {
            Ok(existing) => existing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(RegistrarError::from_io(e, format!("read {}", conf.display()))),
        };

        let target_line = entry_line("R!", target);
        if existing.lines().any(|line| line == target_line) {
            debug!(target = %target.display(), "already registered for boot-time removal");
            return Ok(format!("already registered in {}", conf.display()));
        }

        let self_line = entry_line("r!", &conf);
        let mut contents = if existing.is_empty() {
            HEADER.to_string()
        } else {
            existing
        };
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(&target_line);
        contents.push('\n');
        if !contents.lines().any(|line| line == self_line) {
            contents.push_str(&self_line);
            contents.push('\n');
        }

        self.write_atomically(&contents)?;
        info!(target = %target.display(), conf = %conf.display(), "registered for boot-time removal");
        Ok(format!("registered in {}; removed at next boot", conf.display()))
    }
}
