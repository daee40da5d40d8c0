/*!
 * Structured Tracing
 * Tracing initialisation and per-strategy spans
 *
 * Features:
 * - One trace id per reclamation session for log correlation
 * - JSON-formatted logs for structured parsing
 * - Strategy spans recording duration and result
 */

use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Strategies slower than this are logged at warn level
const SLOW_STRATEGY_THRESHOLD: Duration = Duration::from_secs(5);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RECLAIM_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("RECLAIM_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_span_events(FmtSpan::NONE)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    };

    if initialized.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique session id for log correlation
pub fn generate_session_id() -> Uuid {
    Uuid::new_v4()
}

/// Span covering one strategy attempt
pub struct StrategySpan {
    span: tracing::Span,
    start: Instant,
    strategy: &'static str,
    session_id: Uuid,
}

impl StrategySpan {
    pub fn new(session_id: Uuid, strategy: &'static str, index: usize) -> Self {
        let span = span!(
            Level::INFO,
            "strategy",
            session_id = %session_id,
            strategy = strategy,
            index = index,
            duration_ms = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        let _entered = span.enter();
        debug!(strategy, index, "strategy started");
        drop(_entered);

        Self {
            span,
            start: Instant::now(),
            strategy,
            session_id,
        }
    }

    /// Clone of the underlying span, for entering on another thread
    pub fn span(&self) -> tracing::Span {
        self.span.clone()
    }

    /// Record the attempt result
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "failure" });
    }

    /// Record an error
    pub fn record_error(&self, error: &str) {
        self.span.record("error", error);
        self.span.record("result", "failure");
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for StrategySpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_ms", duration.as_millis() as u64);

        if duration > SLOW_STRATEGY_THRESHOLD {
            warn!(
                session_id = %self.session_id,
                strategy = self.strategy,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow strategy"
            );
        } else {
            debug!(
                session_id = %self.session_id,
                strategy = self.strategy,
                duration_ms = duration.as_millis() as u64,
                "strategy finished"
            );
        }
    }
}
