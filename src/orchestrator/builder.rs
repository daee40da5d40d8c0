/*!
 * Reclaim Engine Builder
 * Builder pattern for ReclaimEngine construction
 */

use super::engine::ReclaimEngine;
use crate::core::config::ReclaimConfig;
use crate::strategy::{Capabilities, StrategyCatalog};
use std::sync::Arc;
use tracing::info;

/// Builder for ReclaimEngine
pub struct ReclaimEngineBuilder {
    config: Option<ReclaimConfig>,
    capabilities: Option<Capabilities>,
    catalog: Option<StrategyCatalog>,
}

impl ReclaimEngineBuilder {
    /// Create a new ReclaimEngine builder
    pub fn new() -> Self {
        Self {
            config: None,
            capabilities: None,
            catalog: None,
        }
    }

    pub fn with_config(mut self, config: ReclaimConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the whole capability set
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Replace the strategy sequence
    pub fn with_catalog(mut self, catalog: StrategyCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Build the ReclaimEngine
    ///
    /// Missing capabilities fall back to the host implementations.
    pub fn build(self) -> ReclaimEngine {
        let config = self.config.unwrap_or_default();
        let caps = self
            .capabilities
            .unwrap_or_else(|| Capabilities::host(&config));

        let catalog = self
            .catalog
            .unwrap_or_else(|| StrategyCatalog::canonical(&config.timeouts));

        info!(
            strategies = %catalog.names().join(", "),
            fallback = catalog.fallback().name(),
            defer_on_failure = config.defer_on_failure,
            name_heuristic = config.name_heuristic,
            "reclaim engine initialized"
        );

        ReclaimEngine {
            config: Arc::new(config),
            caps,
            catalog,
        }
    }
}

impl Default for ReclaimEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
