/*!
 * Engine Limits and Constants
 *
 * Centralized location for timeouts, grace periods, and thresholds.
 * Organized by component.
 *
 * - Safety-critical constants are marked with [SAFETY]
 * - Platform-specific values are marked with [WINDOWS] / [LINUX]
 */

use std::time::Duration;

// =============================================================================
// STRATEGY TIMEOUTS
// =============================================================================

/// Plain removal through the primary file API
pub const DIRECT_REMOVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Lock scan, process termination, and the retry that follows
pub const TERMINATE_HOLDERS_TIMEOUT: Duration = Duration::from_secs(30);

/// Recursive ownership takeover can walk large trees
pub const ESCALATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Rename to a sibling location, then delete
pub const RENAME_TIMEOUT: Duration = Duration::from_secs(15);

/// Truncating every file beneath the target
pub const NEUTRALIZE_TIMEOUT: Duration = Duration::from_secs(30);

/// External removal tool (rm / rd)
pub const ALTERNATE_REMOVAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Directory mirroring tool (rsync / robocopy)
pub const MIRROR_TIMEOUT: Duration = Duration::from_secs(120);

/// Registering a deferred deletion never needs long
pub const DEFERRED_REGISTRATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Headroom between a tool's own deadline and its strategy's timeout
/// so the child is killed before the orchestrator gives up on the strategy
pub const TOOL_DEADLINE_MARGIN: Duration = Duration::from_millis(500);

/// How long a timed-out strategy may keep running before escalation halts
/// [SAFETY] No two strategies ever touch the target at the same time
pub const STRAGGLER_WAIT: Duration = Duration::from_secs(10);

/// Bound on collecting a tool's output once the tool itself has exited
pub const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// PROCESS TERMINATION
// =============================================================================

/// Wait between graceful and forced termination
/// [SAFETY] Bounded; the terminator never waits indefinitely
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Wait after a forced signal before reporting failure
pub const FORCED_CONFIRM_PERIOD: Duration = Duration::from_secs(1);

/// Poll interval while waiting for processes to exit
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// PIDs below this are never signalled (idle/init)
/// [SAFETY]
pub const MIN_SIGNALLABLE_PID: u32 = 2;

// =============================================================================
// LOCK SCANNER
// =============================================================================

/// Shortest leaf name the name heuristic will match on
/// [SAFETY] Prevents "a" or "x" from matching half the process table
pub const MIN_HEURISTIC_LEAF_LEN: usize = 3;

/// Default procfs mount point
/// [LINUX]
pub const PROC_ROOT: &str = "/proc";

/// Bound on one Sysinternals handle.exe run
/// [WINDOWS]
pub const HANDLE_SCAN_TIMEOUT: Duration = Duration::from_secs(20);

// =============================================================================
// RETRIES
// =============================================================================

/// Attempts for the "retry removal" step inside a strategy
pub const REMOVAL_RETRY_ATTEMPTS: u32 = 3;

/// First backoff between removal retries (doubles each attempt)
pub const REMOVAL_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Upper bound for any single backoff sleep
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(2);

// =============================================================================
// PATHS
// =============================================================================

/// Windows MAX_PATH minus the terminator
/// [WINDOWS] Longer paths need the \\?\ prefix
pub const WINDOWS_MAX_PATH: usize = 259;

/// Prefix of the throwaway name used by rename-then-delete
pub const RENAME_PREFIX: &str = ".reclaim-";

/// File name of the systemd-tmpfiles entry used for deferred deletion
/// [LINUX]
pub const TMPFILES_CONF_NAME: &str = "force-reclaim.conf";

/// Directory scanned by systemd-tmpfiles at boot
/// [LINUX]
pub const TMPFILES_DIR: &str = "/etc/tmpfiles.d";
