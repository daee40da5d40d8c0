/*!
 * Tools Module
 * Bounded execution of host tools (rsync, robocopy, takeown, handle, ...)
 */

pub mod runner;
pub mod types;

pub use runner::{run_tool, CommandRunner, HostCommandRunner};
pub use types::{ToolError, ToolOutput, ToolResult};
