/*!
 * Reclaim Service
 *
 * Entry contract in front of the engine: confirmation, path validation,
 * protected-path refusal, the elevation pre-flight, and one session per
 * normalized path at a time. Dry runs go through the same path checks
 * but need no confirmation and never claim a slot.
 */

use crate::core::config::ReclaimConfig;
use crate::core::errors::{ReclaimError, ReclaimResult};
use crate::orchestrator::ReclaimEngine;
use crate::privilege::is_elevated;
use crate::report::{ReclaimPlan, SessionReport};
use crate::target::{is_protected, normalize};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Releases a path's in-flight slot on drop
struct InFlightGuard {
    in_flight: Arc<DashMap<PathBuf, ()>>,
    key: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}

/// Path-keyed front door to the engine
#[derive(Clone)]
pub struct ReclaimService {
    engine: ReclaimEngine,
    in_flight: Arc<DashMap<PathBuf, ()>>,
    elevation_check: fn() -> bool,
}

impl ReclaimService {
    pub fn new(engine: ReclaimEngine) -> Self {
        Self {
            engine,
            in_flight: Arc::new(DashMap::new()),
            elevation_check: is_elevated,
        }
    }

    /// Service over the host capabilities
    pub fn host(config: ReclaimConfig) -> Self {
        Self::new(ReclaimEngine::new(config))
    }

    /// Replace the elevation check
    pub fn with_elevation_check(mut self, check: fn() -> bool) -> Self {
        self.elevation_check = check;
        self
    }

    pub fn engine(&self) -> &ReclaimEngine {
        &self.engine
    }

    /// Number of sessions currently running
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub async fn reclaim(
        &self,
        path: impl AsRef<Path>,
        confirmed: bool,
    ) -> ReclaimResult<SessionReport> {
        self.reclaim_with_cancel(path, confirmed, CancellationToken::new())
            .await
    }

    pub async fn reclaim_with_cancel(
        &self,
        path: impl AsRef<Path>,
        confirmed: bool,
        cancel: CancellationToken,
    ) -> ReclaimResult<SessionReport> {
        let path = normalize(path.as_ref())?;
        if !confirmed {
            return Err(ReclaimError::NotConfirmed(path));
        }

        let config = self.engine.config();
        if !config.allow_protected && is_protected(&path) {
            return Err(ReclaimError::ProtectedPath(path));
        }
        self.preflight_elevation(config)?;

        let _guard = self.claim(&path)?;
        Ok(self.engine.run_session(path, cancel).await)
    }

    /// Dry run: what `reclaim` would do with `path`, touching nothing
    pub async fn plan(&self, path: impl AsRef<Path>) -> ReclaimResult<ReclaimPlan> {
        let path = normalize(path.as_ref())?;
        if !self.engine.config().allow_protected && is_protected(&path) {
            return Err(ReclaimError::ProtectedPath(path));
        }

        let mut plan = self.engine.plan_normalized(path).await;
        plan.elevated = Some((self.elevation_check)());
        Ok(plan)
    }

    pub async fn plan_all<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Vec<(PathBuf, ReclaimResult<ReclaimPlan>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            results.push((path.to_path_buf(), self.plan(path).await));
        }
        results
    }

    /// Reclaim several paths one after another
    ///
    /// Caller-contract errors are per path; one never stops the rest.
    pub async fn reclaim_all<P: AsRef<Path>>(
        &self,
        paths: &[P],
        confirmed: bool,
        cancel: CancellationToken,
    ) -> Vec<(PathBuf, ReclaimResult<SessionReport>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let result = self
                .reclaim_with_cancel(path, confirmed, cancel.clone())
                .await;
            results.push((path.to_path_buf(), result));
        }
        results
    }

    fn preflight_elevation(&self, config: &ReclaimConfig) -> ReclaimResult<()> {
        if (self.elevation_check)() {
            return Ok(());
        }
        if config.require_elevation {
            return Err(ReclaimError::InsufficientPrivilege(
                "ownership takeover and process termination need an elevated caller".to_string(),
            ));
        }
        warn!("not elevated; escalation and termination will likely fail");
        Ok(())
    }

    fn claim(&self, path: &Path) -> ReclaimResult<InFlightGuard> {
        let key = in_flight_key(path);
        match self.in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                info!(path = %path.display(), "session already in flight");
                Err(ReclaimError::Busy(path.to_path_buf()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(InFlightGuard {
                    in_flight: self.in_flight.clone(),
                    key,
                })
            }
        }
    }
}

/// Windows paths compare case-insensitively
fn in_flight_key(path: &Path) -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    } else {
        path.to_path_buf()
    }
}
