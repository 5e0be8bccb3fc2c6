//! The ordered set of backends the control plane owns.

use std::sync::Arc;

use tracing::debug;

use crate::domain::backend::{Backend, BackendId, SharedBackend};
use crate::error::TopologyError;

/// An ordered sequence of backends with unique identities.
///
/// Order is insertion order. It is the order round-robin walks and the index
/// space simple-hash and static select from; it says nothing about ring order.
///
/// Only the control plane mutates a topology. Strategies receive copies of the
/// backend list via [`Topology::snapshot`] and never see later mutations.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    backends: Vec<SharedBackend>,
}

impl Topology {
    /// Create a topology from seed backends, rejecting duplicate identities.
    pub fn new(seeds: impl IntoIterator<Item = BackendId>) -> Result<Self, TopologyError> {
        let mut topology = Self::default();
        for id in seeds {
            topology.add(Arc::new(Backend::new(id)))?;
        }
        Ok(topology)
    }

    /// Append a backend. Fails without mutating if the identity is taken.
    pub fn add(&mut self, backend: SharedBackend) -> Result<(), TopologyError> {
        if self.contains(backend.id()) {
            return Err(TopologyError::DuplicateBackend(backend.id().clone()));
        }
        debug!(backend = %backend.id(), "added backend to topology");
        self.backends.push(backend);
        Ok(())
    }

    /// Remove a backend by identity, preserving the order of the others.
    pub fn remove(&mut self, id: &BackendId) -> Result<SharedBackend, TopologyError> {
        let index = self
            .backends
            .iter()
            .position(|b| b.id() == id)
            .ok_or_else(|| TopologyError::UnknownBackend(id.clone()))?;
        debug!(backend = %id, "removed backend from topology");
        Ok(self.backends.remove(index))
    }

    /// True if a backend with this identity is registered.
    pub fn contains(&self, id: &BackendId) -> bool {
        self.backends.iter().any(|b| b.id() == id)
    }

    /// Look a backend up by identity.
    pub fn get(&self, id: &BackendId) -> Option<&SharedBackend> {
        self.backends.iter().find(|b| b.id() == id)
    }

    /// Number of backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// True when no backend is registered.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Iterate backends in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SharedBackend> {
        self.backends.iter()
    }

    /// A copy of the backend list for a strategy to own.
    pub fn snapshot(&self) -> Vec<SharedBackend> {
        self.backends.clone()
    }
}
