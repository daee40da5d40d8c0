/*!
 * Rename Then Delete
 *
 * Moves the target to a throwaway sibling name and deletes it there.
 * Renames can succeed where deletes fail because they do not need every
 * descendant handle closed. When deletion at the throwaway location
 * fails the target is moved back, so nothing is stranded under an
 * unexpected name.
 */

use super::context::StrategyContext;
use super::traits::Strategy;
use crate::core::errors::{StrategyError, StrategyResult};
use crate::core::limits::RENAME_PREFIX;
use crate::core::timeout::TimeoutPolicy;
use crate::core::types::Invasiveness;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use uuid::Uuid;

pub struct RenameThenDelete {
    timeout: TimeoutPolicy,
}

impl RenameThenDelete {
    pub const NAME: &'static str = "rename-then-delete";

    pub fn new(timeout: TimeoutPolicy) -> Self {
        Self { timeout }
    }

    fn throwaway_for(path: &Path) -> StrategyResult<PathBuf> {
        let parent = path.parent().ok_or_else(|| {
            StrategyError::Io(format!("{} has no parent directory", path.display()))
        })?;
        Ok(parent.join(format!("{}{}", RENAME_PREFIX, Uuid::new_v4().simple())))
    }
}

impl Strategy for RenameThenDelete {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn invasiveness(&self) -> Invasiveness {
        Invasiveness::Moderate
    }

    fn timeout(&self) -> TimeoutPolicy {
        self.timeout
    }

    fn execute(&self, ctx: &StrategyContext) -> StrategyResult<String> {
        let files = &ctx.caps().files;
        let original = ctx.target().path();
        let throwaway = Self::throwaway_for(original)?;

        files.rename(original, &throwaway).map_err(|e| {
            let context = format!("rename {} to {}", original.display(), throwaway.display());
            StrategyError::from_io(e, context)
        })?;
        debug!(from = %original.display(), to = %throwaway.display(), "target renamed");

        let removal = ctx.retry().execute(
            |_| {
                files.remove(&throwaway).map_err(|e| {
                    StrategyError::from_io(e, format!("remove {}", throwaway.display()))
                })
            },
            |e| matches!(e, StrategyError::TransientLock(_) | StrategyError::Io(_)),
        );

        let err = match removal {
            Ok(()) => {
                return Ok(format!(
                    "renamed to {} and removed",
                    throwaway.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
                ))
            }
            Err(err) => err,
        };

        match files.rename(&throwaway, original) {
            Ok(()) => {
                warn!(error = %err, "removal after rename failed; target restored");
                Err(err.context("renamed but could not delete; moved back to original path"))
            }
            Err(rollback) => {
                error!(
                    residue = %throwaway.display(),
                    error = %rollback,
                    "rollback failed; target left under throwaway name"
                );
                ctx.record_residue(throwaway.clone());
                Err(err.context(format!(
                    "renamed but could not delete; rollback failed ({}); residue left at {}",
                    rollback,
                    throwaway.display()
                )))
            }
        }
    }
}
