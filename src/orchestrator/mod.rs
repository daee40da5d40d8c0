/*!
 * Escalation Orchestrator
 * Sessions, the engine that drives them, and its builder
 */

pub mod builder;
pub mod engine;
pub mod session;

pub use builder::ReclaimEngineBuilder;
pub use engine::ReclaimEngine;
pub use session::{AttemptRecord, Outcome, ReclamationSession};
