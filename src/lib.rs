/*!
 * Force Reclaim Library
 *
 * Removes files and directory trees that ordinary deletion cannot:
 * held open, permission-locked, or otherwise stuck. Strategies run in
 * order of increasing invasiveness until the target is confirmed gone;
 * deferred deletion at next system start is the terminal fallback.
 */

pub mod core;
pub mod deferred;
pub mod monitoring;
pub mod orchestrator;
pub mod privilege;
pub mod process;
pub mod report;
pub mod scanner;
pub mod service;
pub mod strategy;
pub mod target;
pub mod tools;

// Re-exports
pub use crate::core::{
    Deadline, FailureKind, Invasiveness, Pid, ReclaimConfig, ReclaimError, ReclaimResult, RetryPolicy,
    StrategyError, StrategyResult, StrategyTimeouts, TimeoutPolicy,
};
pub use monitoring::{generate_session_id, init_tracing, StrategySpan};
pub use orchestrator::{
    AttemptRecord, Outcome, ReclaimEngine, ReclaimEngineBuilder, ReclamationSession,
};
pub use report::{
    render_json, render_plan_json, render_plan_text, render_summary, render_text, ReclaimPlan,
    SessionReport,
};
pub use service::ReclaimService;
pub use strategy::{Capabilities, Strategy, StrategyCatalog, StrategyContext};
pub use target::{Target, TargetKind};
