/*!
 * Process Module
 * Process-table access and lock-holder termination
 */

pub mod allowlist;
pub mod table;
pub mod terminator;
pub mod traits;
pub mod types;

pub use allowlist::AllowList;
pub use table::HostProcessTable;
pub use terminator::ProcessTerminator;
pub use traits::ProcessTable;
pub use types::{
    ProcessError, ProcessInfo, ProcessResult, Signal, Termination, TerminationOutcome,
};
