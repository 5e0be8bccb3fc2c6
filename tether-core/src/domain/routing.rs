//! Routing module for publishing the active strategy to the data plane.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::domain::backend::SharedBackend;
use crate::load_balancer::strategy::Strategy;

/// A lock-free routing table holding the active strategy.
///
/// Uses `ArcSwap` so the control plane can publish a fully built replacement
/// strategy without the data plane ever taking a lock. A reader dereferences
/// either the old strategy or the new one, never a half-built ring.
#[derive(Debug)]
pub struct RoutingTable {
    strategy: ArcSwap<Strategy>,
}

impl RoutingTable {
    /// Create a routing table serving `initial`.
    pub fn new(initial: Strategy) -> Self {
        Self {
            strategy: ArcSwap::from_pointee(initial),
        }
    }

    /// Atomically replace the active strategy.
    pub fn publish(&self, next: Strategy) {
        self.strategy.store(Arc::new(next));
    }

    /// Select a backend for a live connection.
    pub fn select(&self, key: &str) -> Option<SharedBackend> {
        self.strategy.load().select(key)
    }

    /// Retrieve the active strategy (e.g., to take a snapshot or rebuild it).
    pub fn current(&self) -> Arc<Strategy> {
        self.strategy.load_full()
    }
}

/// A shared reference to the lock-free routing table.
pub type SharedRoutingTable = Arc<RoutingTable>;
