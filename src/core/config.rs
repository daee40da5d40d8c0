/*!
 * Engine Configuration
 *
 * Named profiles plus environment overrides:
 * - RECLAIM_CONFIG: path to a JSON file applied over the profile
 * - RECLAIM_PROFILE: default | aggressive | relaxed
 * - RECLAIM_GRACE_MS: grace period before forced termination
 * - RECLAIM_STRAGGLER_MS: wait for a timed-out strategy before halting
 * - RECLAIM_NAME_HEURISTIC: match processes by target leaf name (opt-in)
 * - RECLAIM_SWEEP_ALLOW_LIST: also terminate allow-listed lock holders (opt-in)
 * - RECLAIM_NO_DEFER: skip deferred deletion when every strategy fails
 * - RECLAIM_REQUIRE_ELEVATION: fail fast when not elevated
 * - RECLAIM_ALLOW_PROTECTED: permit system roots as targets
 */

use super::errors::{ReclaimError, ReclaimResult};
use super::limits::*;
use super::retry::RetryPolicy;
use super::timeout::TimeoutPolicy;
use crate::process::AllowList;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Per-strategy timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyTimeouts {
    pub direct: TimeoutPolicy,
    pub terminate: TimeoutPolicy,
    pub escalate: TimeoutPolicy,
    pub rename: TimeoutPolicy,
    pub neutralize: TimeoutPolicy,
    pub alternate: TimeoutPolicy,
    pub mirror: TimeoutPolicy,
    pub deferred: TimeoutPolicy,
}

impl StrategyTimeouts {
    /// Create default timeout configuration
    pub fn new() -> Self {
        Self {
            direct: TimeoutPolicy::Strategy(DIRECT_REMOVAL_TIMEOUT),
            terminate: TimeoutPolicy::Strategy(TERMINATE_HOLDERS_TIMEOUT),
            escalate: TimeoutPolicy::Strategy(ESCALATION_TIMEOUT),
            rename: TimeoutPolicy::Strategy(RENAME_TIMEOUT),
            neutralize: TimeoutPolicy::Strategy(NEUTRALIZE_TIMEOUT),
            alternate: TimeoutPolicy::Strategy(ALTERNATE_REMOVAL_TIMEOUT),
            mirror: TimeoutPolicy::Strategy(MIRROR_TIMEOUT),
            deferred: TimeoutPolicy::Strategy(DEFERRED_REGISTRATION_TIMEOUT),
        }
    }

    /// Short bounds for interactive use on small targets
    pub fn aggressive() -> Self {
        Self {
            direct: TimeoutPolicy::Strategy(Duration::from_secs(3)),
            terminate: TimeoutPolicy::Strategy(Duration::from_secs(10)),
            escalate: TimeoutPolicy::Strategy(Duration::from_secs(20)),
            rename: TimeoutPolicy::Strategy(Duration::from_secs(5)),
            neutralize: TimeoutPolicy::Strategy(Duration::from_secs(10)),
            alternate: TimeoutPolicy::Strategy(Duration::from_secs(20)),
            mirror: TimeoutPolicy::Strategy(Duration::from_secs(30)),
            deferred: TimeoutPolicy::Strategy(Duration::from_secs(5)),
        }
    }

    /// Long bounds for huge trees or slow disks
    pub fn relaxed() -> Self {
        Self {
            direct: TimeoutPolicy::Strategy(Duration::from_secs(120)),
            terminate: TimeoutPolicy::Strategy(Duration::from_secs(120)),
            escalate: TimeoutPolicy::Strategy(Duration::from_secs(600)),
            rename: TimeoutPolicy::Strategy(Duration::from_secs(60)),
            neutralize: TimeoutPolicy::Strategy(Duration::from_secs(300)),
            alternate: TimeoutPolicy::Strategy(Duration::from_secs(300)),
            mirror: TimeoutPolicy::Strategy(Duration::from_secs(600)),
            deferred: TimeoutPolicy::Strategy(Duration::from_secs(60)),
        }
    }

    /// Uniform timeout for every strategy (testing)
    pub fn uniform(timeout: Duration) -> Self {
        let policy = TimeoutPolicy::Strategy(timeout);
        Self {
            direct: policy,
            terminate: policy,
            escalate: policy,
            rename: policy,
            neutralize: policy,
            alternate: policy,
            mirror: policy,
            deferred: policy,
        }
    }
}

impl Default for StrategyTimeouts {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct ReclaimConfig {
    pub timeouts: StrategyTimeouts,
    /// Wait between graceful and forced termination
    pub grace_period: Duration,
    /// Wait for a timed-out strategy to return before escalation halts
    pub straggler_wait: Duration,
    /// Policy for "retry removal" steps inside strategies
    pub removal_retry: RetryPolicy,
    /// Opt-in: match lock holders by target leaf name
    pub name_heuristic: bool,
    /// Opt-in: terminate allow-listed processes alongside discovered holders
    pub sweep_allow_list: bool,
    pub allow_list: AllowList,
    /// Register deferred deletion when every strategy fails
    pub defer_on_failure: bool,
    /// Fail fast when the caller is not elevated
    pub require_elevation: bool,
    /// Permit filesystem roots and system directories as targets
    pub allow_protected: bool,
}

impl ReclaimConfig {
    /// Create default configuration
    pub fn new() -> Self {
        Self {
            timeouts: StrategyTimeouts::new(),
            grace_period: DEFAULT_GRACE_PERIOD,
            straggler_wait: STRAGGLER_WAIT,
            removal_retry: RetryPolicy::removal(),
            name_heuristic: false,
            sweep_allow_list: false,
            allow_list: AllowList::platform_default(),
            defer_on_failure: true,
            require_elevation: true,
            allow_protected: false,
        }
    }

    /// Aggressive profile: short bounds, short grace period
    pub fn aggressive() -> Self {
        Self {
            timeouts: StrategyTimeouts::aggressive(),
            grace_period: Duration::from_secs(1),
            ..Self::new()
        }
    }

    /// Relaxed profile for slow environments
    pub fn relaxed() -> Self {
        Self {
            timeouts: StrategyTimeouts::relaxed(),
            grace_period: Duration::from_secs(10),
            removal_retry: RetryPolicy::new(5, REMOVAL_RETRY_BACKOFF),
            ..Self::new()
        }
    }

    /// Tiny bounds, no elevation requirement (testing only)
    pub fn for_testing() -> Self {
        Self {
            timeouts: StrategyTimeouts::uniform(Duration::from_secs(5)),
            grace_period: Duration::from_millis(50),
            straggler_wait: Duration::from_secs(2),
            removal_retry: RetryPolicy::new(2, Duration::from_millis(1)),
            require_elevation: false,
            ..Self::new()
        }
    }

    /// Load configuration from the environment
    pub fn from_env() -> ReclaimResult<Self> {
        let mut config = match std::env::var("RECLAIM_PROFILE").ok().as_deref() {
            None | Some("") | Some("default") => Self::new(),
            Some("aggressive") => Self::aggressive(),
            Some("relaxed") => Self::relaxed(),
            Some(other) => {
                return Err(ReclaimError::Configuration(format!(
                    "unknown RECLAIM_PROFILE '{}'",
                    other
                )))
            }
        };

        if let Ok(path) = std::env::var("RECLAIM_CONFIG") {
            config.apply_file(Path::new(&path))?;
        }

        if let Some(ms) = env_u64("RECLAIM_GRACE_MS")? {
            config.grace_period = Duration::from_millis(ms);
        }
        if let Some(ms) = env_u64("RECLAIM_STRAGGLER_MS")? {
            config.straggler_wait = Duration::from_millis(ms);
        }
        if let Some(flag) = env_flag("RECLAIM_NAME_HEURISTIC") {
            config.name_heuristic = flag;
        }
        if let Some(flag) = env_flag("RECLAIM_SWEEP_ALLOW_LIST") {
            config.sweep_allow_list = flag;
        }
        if let Some(flag) = env_flag("RECLAIM_NO_DEFER") {
            config.defer_on_failure = !flag;
        }
        if let Some(flag) = env_flag("RECLAIM_REQUIRE_ELEVATION") {
            config.require_elevation = flag;
        }
        if let Some(flag) = env_flag("RECLAIM_ALLOW_PROTECTED") {
            config.allow_protected = flag;
        }

        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    /// Apply a JSON config file over the current values
    pub fn apply_file(&mut self, path: &Path) -> ReclaimResult<()> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReclaimError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| {
            ReclaimError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })?;
        self.apply(file);
        Ok(())
    }

    fn apply(&mut self, file: ConfigFile) {
        if let Some(ms) = file.grace_period_ms {
            self.grace_period = Duration::from_millis(ms);
        }
        if let Some(ms) = file.straggler_wait_ms {
            self.straggler_wait = Duration::from_millis(ms);
        }
        if let Some(secs) = file.strategy_timeout_secs {
            self.timeouts = StrategyTimeouts::uniform(Duration::from_secs(secs));
        }
        if let Some(v) = file.name_heuristic {
            self.name_heuristic = v;
        }
        if let Some(v) = file.sweep_allow_list {
            self.sweep_allow_list = v;
        }
        if let Some(names) = file.allow_list {
            self.allow_list = AllowList::new(names);
        }
        if let Some(v) = file.defer_on_failure {
            self.defer_on_failure = v;
        }
        if let Some(v) = file.require_elevation {
            self.require_elevation = v;
        }
        if let Some(v) = file.allow_protected {
            self.allow_protected = v;
        }
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk configuration (every field optional)
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    grace_period_ms: Option<u64>,
    straggler_wait_ms: Option<u64>,
    strategy_timeout_secs: Option<u64>,
    name_heuristic: Option<bool>,
    sweep_allow_list: Option<bool>,
    allow_list: Option<Vec<String>>,
    defer_on_failure: Option<bool>,
    require_elevation: Option<bool>,
    allow_protected: Option<bool>,
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u64(key: &str) -> ReclaimResult<Option<u64>> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ReclaimError::Configuration(format!("{} must be an integer", key))),
        Err(_) => Ok(None),
    }
}
