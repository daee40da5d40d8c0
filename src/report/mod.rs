/*!
 * Session Reporter
 * Aggregates a session's attempts and outcome for the caller
 */

pub mod plan;
pub mod render;
pub mod types;

pub use plan::{render_plan_json, render_plan_text, PlannedStep, ReclaimPlan};
pub use render::{render_json, render_summary, render_text};
pub use types::SessionReport;
