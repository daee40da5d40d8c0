/*!
 * Deferred Registrar Traits
 */

use crate::core::errors::StrategyError;
use std::path::Path;
use thiserror::Error;

/// Registrar operation result
pub type RegistrarResult<T> = Result<T, RegistrarError>;

/// Registrar errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrarError {
    #[error("Deferred deletion unsupported: {0}")]
    Unsupported(String),

    #[error("Deferred deletion refused: {0}")]
    PermissionDenied(String),

    #[error("Deferred deletion failed: {0}")]
    Failed(String),
}

impl From<RegistrarError> for StrategyError {
    fn from(err: RegistrarError) -> Self {
        match err {
            RegistrarError::Unsupported(_) => StrategyError::PlatformUnsupported(err.to_string()),
            RegistrarError::PermissionDenied(_) => StrategyError::Privilege(err.to_string()),
            RegistrarError::Failed(_) => StrategyError::Io(err.to_string()),
        }
    }
}

impl RegistrarError {
    pub fn from_io(err: std::io::Error, context: impl AsRef<str>) -> Self {
        let message = format!("{}: {}", context.as_ref(), err);
        if err.kind() == std::io::ErrorKind::PermissionDenied {
            RegistrarError::PermissionDenied(message)
        } else {
            RegistrarError::Failed(message)
        }
    }
}

/// Persists a request for the OS to remove a path at next system start
///
/// Must not require the target to be closed or unlocked. Registering the
/// same path twice is harmless.
#[cfg_attr(test, mockall::automock)]
pub trait DeferredRegistrar: Send + Sync {
    /// Mechanism name for reports
    fn name(&self) -> &'static str;

    /// Register `target`; returns a diagnostic on acceptance
    fn register(&self, target: &Path) -> RegistrarResult<String>;
}

/// Registrar for hosts without a boot-time removal facility
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedRegistrar;

impl DeferredRegistrar for UnsupportedRegistrar {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn register(&self, target: &Path) -> RegistrarResult<String> {
        Err(RegistrarError::Unsupported(format!(
            "no boot-time removal facility for {}",
            target.display()
        )))
    }
}
