/*!
 * Core Module
 * Errors, limits, timeouts, retry policy, configuration, serde helpers
 */

pub mod config;
pub mod errors;
pub mod limits;
pub mod retry;
pub mod serde;
pub mod timeout;
pub mod types;

pub use config::{ReclaimConfig, StrategyTimeouts};
pub use errors::{
    FailureKind, ReclaimError, ReclaimResult, StrategyError, StrategyResult,
};
pub use retry::RetryPolicy;
pub use timeout::{Deadline, TimeoutPolicy};
pub use types::{Invasiveness, Pid, Size};
