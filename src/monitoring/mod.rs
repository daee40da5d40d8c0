/*!
 * Monitoring
 * Structured tracing for reclamation sessions
 */

mod tracer;

pub use tracer::{generate_session_id, init_tracing, StrategySpan};
