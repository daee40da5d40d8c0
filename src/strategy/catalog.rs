/*!
 * Strategy Catalog
 *
 * The fixed escalation sequence, lowest invasiveness first, plus the
 * terminal fallback held apart from it.
 */

use super::deferred::DeferredDeletion;
use super::direct::DirectRemoval;
use super::escalate::EscalateOwnership;
use super::mirror::MirrorToEmpty;
use super::neutralize::NeutralizeContents;
use super::rename::RenameThenDelete;
use super::shell::AlternateRemoval;
use super::terminate::TerminateHolders;
use super::traits::Strategy;
use crate::core::config::StrategyTimeouts;
use std::sync::Arc;

/// Ordered strategy list and terminal fallback
#[derive(Clone)]
pub struct StrategyCatalog {
    strategies: Vec<Arc<dyn Strategy>>,
    fallback: Arc<dyn Strategy>,
}

impl StrategyCatalog {
    /// Canonical order with the given per-strategy bounds
    pub fn canonical(timeouts: &StrategyTimeouts) -> Self {
        let strategies: Vec<Arc<dyn Strategy>> = vec![
            Arc::new(DirectRemoval::new(timeouts.direct)),
            Arc::new(TerminateHolders::new(timeouts.terminate)),
            Arc::new(EscalateOwnership::new(timeouts.escalate)),
            Arc::new(RenameThenDelete::new(timeouts.rename)),
            Arc::new(NeutralizeContents::new(timeouts.neutralize)),
            Arc::new(AlternateRemoval::new(timeouts.alternate)),
            Arc::new(MirrorToEmpty::new(timeouts.mirror)),
        ];
        Self {
            strategies,
            fallback: Arc::new(DeferredDeletion::new(timeouts.deferred)),
        }
    }

    /// Custom sequence (tests, embedding)
    pub fn from_parts(strategies: Vec<Arc<dyn Strategy>>, fallback: Arc<dyn Strategy>) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    pub fn strategies(&self) -> &[Arc<dyn Strategy>] {
        &self.strategies
    }

    pub fn fallback(&self) -> &Arc<dyn Strategy> {
        &self.fallback
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
