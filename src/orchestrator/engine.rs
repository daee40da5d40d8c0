/*!
 * Escalation Orchestrator
 *
 * Drives the strategy catalog in order against one target, re-checking
 * the target before and after every attempt and stopping at the first
 * confirmed absence. On exhaustion it falls back to deferred deletion.
 *
 * ## Isolation
 *
 * Each strategy runs on the blocking pool under its own timeout, and the
 * context carries the matching absolute deadline so every tool it spawns
 * is bounded by what is left of the attempt. A panic surfaces as a
 * `JoinError` and is recorded as a fault; a timeout is recorded as a
 * timeout. Neither stops the next strategy on its own.
 *
 * A timed-out strategy cannot be interrupted, so the orchestrator waits a
 * bounded straggler period for it to return before moving on. If it is
 * still running after that, escalation halts: no two strategies ever act
 * on the target at the same time.
 *
 * ## Dry Run
 *
 * `plan` reports the footprint, the current lock holders and the strategy
 * order for a target without running a single strategy.
 *
 * ## Cancellation
 *
 * Cooperative and honored between strategies only. A cancelled session
 * ends `Failed` and never registers deferred deletion.
 */

use super::session::{AttemptRecord, Outcome, ReclamationSession};
use crate::core::config::ReclaimConfig;
use crate::core::errors::{
    FailureKind, ReclaimError, ReclaimResult, StrategyError, StrategyResult,
};
use crate::monitoring::{generate_session_id, StrategySpan};
use crate::report::{PlannedStep, ReclaimPlan, SessionReport};
use crate::strategy::{Capabilities, Strategy, StrategyCatalog, StrategyContext};
use crate::target::{normalize, Footprint, Target};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Escalating reclamation engine
#[derive(Clone)]
pub struct ReclaimEngine {
    pub(super) config: Arc<ReclaimConfig>,
    pub(super) caps: Capabilities,
    pub(super) catalog: StrategyCatalog,
}

impl ReclaimEngine {
    /// Engine over the host capabilities with the canonical catalog
    pub fn new(config: ReclaimConfig) -> Self {
        super::builder::ReclaimEngineBuilder::new()
            .with_config(config)
            .build()
    }

    pub fn builder() -> super::builder::ReclaimEngineBuilder {
        super::builder::ReclaimEngineBuilder::new()
    }

    pub fn config(&self) -> &ReclaimConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// Reclaim `path`; `confirmed` must carry the caller's explicit consent
    ///
    /// Only caller-contract violations are returned as errors. Every
    /// strategy failure ends up in the report instead.
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
        Ok(self.run_session(path, cancel).await)
    }

    /// Preview what `reclaim` would do with `path`; acts on nothing
    pub async fn plan(&self, path: impl AsRef<Path>) -> ReclaimResult<ReclaimPlan> {
        let path = normalize(path.as_ref())?;
        Ok(self.plan_normalized(path).await)
    }

    pub(crate) async fn plan_normalized(&self, path: PathBuf) -> ReclaimPlan {
        let kind = self.caps.files.kind(&path);
        let mut plan = ReclaimPlan {
            target: path.clone(),
            kind,
            size_bytes: 0,
            entries: 0,
            holders: Vec::new(),
            scan_error: None,
            sweep_allow_list: self.config.sweep_allow_list,
            steps: Vec::new(),
            fallback: None,
            elevated: None,
        };
        if kind.is_absent() {
            debug!(path = %path.display(), "dry run: target already absent");
            return plan;
        }

        let footprint = self.measure(&path).await;
        plan.size_bytes = footprint.bytes;
        plan.entries = footprint.entries;

        let scanner = self.caps.scanner.clone();
        let scan_path = path.clone();
        match tokio::task::spawn_blocking(move || scanner.scan(&scan_path)).await {
            Ok(Ok(holders)) => plan.holders = holders,
            Ok(Err(e)) => plan.scan_error = Some(e.to_string()),
            Err(e) => plan.scan_error = Some(format!("scan task failed: {}", e)),
        }

        plan.steps = self
            .catalog
            .strategies()
            .iter()
            .map(|s| PlannedStep::of(s.as_ref()))
            .collect();
        if self.config.defer_on_failure {
            plan.fallback = Some(PlannedStep::of(self.catalog.fallback().as_ref()));
        }

        info!(
            path = %path.display(),
            holders = plan.holders.len(),
            steps = plan.steps.len(),
            "dry run planned"
        );
        plan
    }

    /// Run one session against an already-normalized path
    pub(crate) async fn run_session(
        &self,
        path: PathBuf,
        cancel: CancellationToken,
    ) -> SessionReport {
        let session_id = generate_session_id();
        let span = info_span!("reclaim", session_id = %session_id, target = %path.display());

        async move {
            let files = self.caps.files.clone();
            let kind = files.kind(&path);
            let mut session =
                ReclamationSession::new(session_id, Target::new(path.clone(), kind));

            if kind.is_absent() {
                info!("target already absent");
                session.finish(Outcome::Deleted);
                return SessionReport::from_session(&session);
            }

            info!(%kind, strategies = self.catalog.len(), "reclamation started");
            session.set_footprint(self.measure(&path).await);

            let ctx = Arc::new(StrategyContext::new(
                session.target().clone(),
                self.caps.clone(),
                &self.config,
            ));

            let outcome = self.escalate(&mut session, &ctx, &cancel).await;
            session.absorb(ctx.effects());

            let outcome = match outcome {
                Some(outcome) => outcome,
                None if session.is_cancelled() => Outcome::Failed,
                None if !self.config.defer_on_failure => {
                    info!("every strategy failed; deferred deletion disabled");
                    Outcome::Failed
                }
                None => self.fall_back(&mut session, &ctx, &cancel).await,
            };

            if outcome != Outcome::Deleted {
                let residual = self.measure(&path).await.entries;
                session.set_residual_entries(residual);
            }
            session.finish(outcome);

            info!(
                %outcome,
                attempts = session.attempts().len(),
                elapsed_ms = session.elapsed().as_millis() as u64,
                "reclamation finished"
            );
            SessionReport::from_session(&session)
        }
        .instrument(span)
        .await
    }

    /// Try strategies in order; Some(Deleted) on confirmed absence
    async fn escalate(
        &self,
        session: &mut ReclamationSession,
        ctx: &Arc<StrategyContext>,
        cancel: &CancellationToken,
    ) -> Option<Outcome> {
        let path = ctx.target().path();

        for (index, strategy) in self.catalog.strategies().iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(next = strategy.name(), "session cancelled");
                session.mark_cancelled();
                return None;
            }
            if !self.caps.files.exists(path) {
                info!(before = strategy.name(), "target vanished between strategies");
                return Some(Outcome::Deleted);
            }

            let Bounded {
                result,
                span,
                elapsed,
                still_running,
            } = self.run_bounded(session.id(), index, strategy, ctx).await;
            let present = self.caps.files.exists(path);

            let mut attempt = match (result, present) {
                (Ok(detail), false) => AttemptRecord::success(
                    strategy.name(),
                    strategy.invasiveness(),
                    detail,
                    elapsed,
                ),
                (Ok(detail), true) => AttemptRecord::failure(
                    strategy.name(),
                    strategy.invasiveness(),
                    FailureKind::StillPresent,
                    format!("{}; target still present", detail),
                    elapsed,
                ),
                (Err(e), false) => AttemptRecord::success(
                    strategy.name(),
                    strategy.invasiveness(),
                    format!("target absent despite error: {}", e),
                    elapsed,
                ),
                (Err(e), true) => AttemptRecord::failure(
                    strategy.name(),
                    strategy.invasiveness(),
                    e.kind(),
                    e.to_string(),
                    elapsed,
                ),
            };

            if still_running && !attempt.succeeded {
                attempt.diagnostic = format!(
                    "{}; still running after {}ms, escalation halted",
                    attempt.diagnostic,
                    self.config.straggler_wait.as_millis()
                );
            }

            if attempt.succeeded {
                span.record_result(true);
            } else {
                span.record_error(&attempt.diagnostic);
                debug!(
                    strategy = strategy.name(),
                    diagnostic = %attempt.diagnostic,
                    "strategy failed"
                );
            }

            let succeeded = attempt.succeeded;
            session.record(attempt);
            if succeeded {
                info!(strategy = strategy.name(), "target removed");
                return Some(Outcome::Deleted);
            }
            if still_running {
                warn!(
                    strategy = strategy.name(),
                    "timed-out strategy still running; escalation halted"
                );
                return Some(Outcome::Failed);
            }
        }
        None
    }

    /// Terminal fallback once every strategy has failed
    async fn fall_back(
        &self,
        session: &mut ReclamationSession,
        ctx: &Arc<StrategyContext>,
        cancel: &CancellationToken,
    ) -> Outcome {
        if cancel.is_cancelled() {
            session.mark_cancelled();
            return Outcome::Failed;
        }
        if !self.caps.files.exists(ctx.target().path()) {
            return Outcome::Deleted;
        }

        let fallback = self.catalog.fallback().clone();
        let index = self.catalog.len();
        let Bounded {
            result,
            span,
            elapsed,
            ..
        } = self.run_bounded(session.id(), index, &fallback, ctx).await;

        let (attempt, outcome) = match result {
            Ok(detail) => {
                span.record_result(true);
                warn!("target scheduled for removal at next system start");
                (
                    AttemptRecord::success(
                        fallback.name(),
                        fallback.invasiveness(),
                        detail,
                        elapsed,
                    ),
                    Outcome::ScheduledForDeferredDeletion,
                )
            }
            Err(e) => {
                span.record_error(&e.to_string());
                warn!(error = %e, "deferred deletion was not accepted");
                (
                    AttemptRecord::failure(
                        fallback.name(),
                        fallback.invasiveness(),
                        e.kind(),
                        e.to_string(),
                        elapsed,
                    ),
                    Outcome::Failed,
                )
            }
        };
        session.record(attempt);

        // Something else may have finished the job meanwhile
        if !self.caps.files.exists(ctx.target().path()) {
            return Outcome::Deleted;
        }
        outcome
    }

    /// Execute one strategy on the blocking pool under its timeout
    ///
    /// On timeout, waits up to the straggler period for the task to
    /// return so the next strategy never overlaps it.
    async fn run_bounded(
        &self,
        session_id: uuid::Uuid,
        index: usize,
        strategy: &Arc<dyn Strategy>,
        ctx: &Arc<StrategyContext>,
    ) -> Bounded {
        let span = StrategySpan::new(session_id, strategy.name(), index);
        let started = Instant::now();
        ctx.begin_attempt(strategy.timeout());

        let task_strategy = Arc::clone(strategy);
        let task_ctx = Arc::clone(ctx);
        let task_span = span.span();
        let mut handle = tokio::task::spawn_blocking(move || {
            let _entered = task_span.enter();
            task_strategy.execute(&task_ctx)
        });

        let Some(limit) = strategy.timeout().duration() else {
            let result = flatten((&mut handle).await);
            let elapsed = span.elapsed();
            return Bounded::finished(result, span, elapsed);
        };

        match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => {
                let elapsed = span.elapsed();
                Bounded::finished(flatten(joined), span, elapsed)
            }
            Err(_) => {
                let elapsed = started.elapsed();
                let timed_out = StrategyError::Timeout {
                    elapsed_ms: elapsed.as_millis() as u64,
                    limit_ms: limit.as_millis() as u64,
                };

                let straggler = self.config.straggler_wait;
                match tokio::time::timeout(straggler, &mut handle).await {
                    Ok(_) => {
                        debug!(strategy = strategy.name(), "timed-out strategy returned");
                        Bounded::finished(Err(timed_out), span, elapsed)
                    }
                    Err(_) => Bounded {
                        result: Err(timed_out),
                        span,
                        elapsed,
                        still_running: true,
                    },
                }
            }
        }
    }

    async fn measure(&self, path: &Path) -> Footprint {
        let files = self.caps.files.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || files.measure(&path))
            .await
            .unwrap_or_default()
    }
}

/// What one bounded strategy run produced
struct Bounded {
    result: StrategyResult<String>,
    span: StrategySpan,
    elapsed: Duration,
    /// The blocking task outlived its timeout and the straggler wait
    still_running: bool,
}

impl Bounded {
    fn finished(result: StrategyResult<String>, span: StrategySpan, elapsed: Duration) -> Self {
        Self {
            result,
            span,
            elapsed,
            still_running: false,
        }
    }
}

fn flatten(joined: Result<StrategyResult<String>, JoinError>) -> StrategyResult<String> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(StrategyError::Fault(format!(
            "panicked: {}",
            panic_message(e.into_panic())
        ))),
        Err(e) => Err(StrategyError::Fault(e.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
