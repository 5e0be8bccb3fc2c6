//! Consistent hashing ring.
//!
//! Each backend contributes a fixed number of virtual replicas, placed at
//! `hash32("<host>:<port>#<replica>")`. A key routes to the first entry
//! clockwise from its own position, wrapping to the start of the ring.
//!
//! Adding or removing a backend only touches that backend's entries, so the
//! only keys that change owner are those landing in the arcs it gains or
//! loses; every other backend keeps its key ranges.

use std::cmp::Ordering;

use tracing::debug;

use crate::domain::backend::{BackendId, SharedBackend};
use crate::load_balancer::hash::hash32;

/// Virtual replicas per backend.
pub const DEFAULT_REPLICAS: usize = 64;

/// One virtual replica: a position on the ring and the backend owning it.
#[derive(Debug, Clone)]
pub struct RingEntry {
    /// Position in the 32-bit ring space.
    pub position: u32,
    /// The owning backend.
    pub backend: SharedBackend,
}

impl RingEntry {
    /// Total order used to keep the ring sorted: position first, then
    /// identity so colliding positions still sort deterministically.
    fn order(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.backend.id().cmp(other.backend.id()))
    }
}

/// A sorted ring of virtual replicas.
#[derive(Debug, Clone)]
pub struct HashRing {
    entries: Vec<RingEntry>,
    replicas: usize,
}

impl HashRing {
    /// Build a ring from scratch with `replicas` entries per backend.
    pub fn build(backends: &[SharedBackend], replicas: usize) -> Self {
        let mut entries: Vec<RingEntry> = backends
            .iter()
            .flat_map(|backend| {
                (0..replicas).map(move |index| RingEntry {
                    position: replica_position(backend.id(), index),
                    backend: backend.clone(),
                })
            })
            .collect();
        entries.sort_by(RingEntry::order);

        debug!(backends = backends.len(), entries = entries.len(), "built hash ring");
        Self { entries, replicas }
    }

    /// Add one backend's replicas in place, keeping the ring sorted.
    pub fn insert(&mut self, backend: &SharedBackend) {
        for index in 0..self.replicas {
            let entry = RingEntry {
                position: replica_position(backend.id(), index),
                backend: backend.clone(),
            };
            let at = self
                .entries
                .partition_point(|e| e.order(&entry) == Ordering::Less);
            self.entries.insert(at, entry);
        }
        debug!(backend = %backend.id(), entries = self.entries.len(), "inserted backend into ring");
    }

    /// Drop every replica owned by `id`. Returns how many entries went away.
    pub fn remove(&mut self, id: &BackendId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.backend.id() != id);
        let removed = before - self.entries.len();
        debug!(backend = %id, removed, "removed backend from ring");
        removed
    }

    /// Route `key` to its clockwise-nearest backend.
    pub fn lookup(&self, key: &str) -> Option<&SharedBackend> {
        self.lookup_position(hash32(key))
    }

    /// The backend owning `slot`: the first entry at or after it, wrapping to
    /// entry 0 past the highest position. `None` on an empty ring.
    pub fn lookup_position(&self, slot: u32) -> Option<&SharedBackend> {
        if self.entries.is_empty() {
            return None;
        }
        let index = self.entries.partition_point(|e| e.position < slot);
        let index = if index == self.entries.len() { 0 } else { index };
        Some(&self.entries[index].backend)
    }

    /// Entries in ring order.
    pub fn entries(&self) -> &[RingEntry] {
        &self.entries
    }

    /// Replicas placed per backend.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no backend is on the ring.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Position of the `index`-th replica of a backend.
fn replica_position(id: &BackendId, index: usize) -> u32 {
    hash32(&format!("{id}#{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backend::Backend;
    use std::sync::Arc;

    fn backends(ports: impl IntoIterator<Item = u16>) -> Vec<SharedBackend> {
        ports
            .into_iter()
            .map(|port| Arc::new(Backend::new(BackendId::localhost(port))))
            .collect()
    }

    fn positions(ring: &HashRing) -> Vec<(u32, String)> {
        ring.entries()
            .iter()
            .map(|e| (e.position, e.backend.id().to_string()))
            .collect()
    }

    #[test]
    fn empty_ring_has_no_backend() {
        let ring = HashRing::build(&[], DEFAULT_REPLICAS);
        assert!(ring.is_empty());
        assert!(ring.lookup("10.0.0.1").is_none());
    }

    #[test]
    fn each_backend_contributes_its_replicas() {
        let ring = HashRing::build(&backends(8081..=8084), DEFAULT_REPLICAS);
        assert_eq!(ring.len(), 4 * DEFAULT_REPLICAS);
        for port in 8081..=8084 {
            let owned = ring
                .entries()
                .iter()
                .filter(|e| e.backend.id().port() == port)
                .count();
            assert_eq!(owned, DEFAULT_REPLICAS);
        }
    }

    #[test]
    fn entries_are_sorted() {
        let ring = HashRing::build(&backends(8081..=8084), DEFAULT_REPLICAS);
        assert!(ring
            .entries()
            .windows(2)
            .all(|w| w[0].order(&w[1]) != Ordering::Greater));
    }

    #[test]
    fn lookup_takes_the_entry_at_the_slot() {
        let ring = HashRing::build(&backends(8081..=8082), 4);
        let entries = ring.entries();
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 && entries[i - 1].position == entry.position {
                continue;
            }
            let owner = ring.lookup_position(entry.position).unwrap();
            assert_eq!(owner.id(), entry.backend.id());
        }
    }

    #[test]
    fn lookup_wraps_past_the_last_entry() {
        let ring = HashRing::build(&backends(8081..=8083), 8);
        let first = &ring.entries()[0];
        let last = &ring.entries()[ring.len() - 1];
        if last.position < u32::MAX {
            let owner = ring.lookup_position(last.position + 1).unwrap();
            assert_eq!(owner.id(), first.backend.id());
        }
        let owner = ring.lookup_position(0).unwrap();
        assert_eq!(owner.id(), first.backend.id());
    }

    #[test]
    fn incremental_insert_matches_full_build() {
        let all = backends(8081..=8085);
        let mut ring = HashRing::build(&all[..4], DEFAULT_REPLICAS);
        ring.insert(&all[4]);
        assert_eq!(positions(&ring), positions(&HashRing::build(&all, DEFAULT_REPLICAS)));
    }

    #[test]
    fn incremental_remove_matches_full_build() {
        let all = backends(8081..=8084);
        let mut ring = HashRing::build(&all, DEFAULT_REPLICAS);
        assert_eq!(ring.remove(&BackendId::localhost(8082)), DEFAULT_REPLICAS);

        let survivors: Vec<_> = all
            .iter()
            .filter(|b| b.id().port() != 8082)
            .cloned()
            .collect();
        assert_eq!(positions(&ring), positions(&HashRing::build(&survivors, DEFAULT_REPLICAS)));
    }

    #[test]
    fn removing_unknown_backend_is_a_no_op() {
        let mut ring = HashRing::build(&backends(8081..=8082), 4);
        assert_eq!(ring.remove(&BackendId::localhost(9999)), 0);
        assert_eq!(ring.len(), 8);
    }
}
