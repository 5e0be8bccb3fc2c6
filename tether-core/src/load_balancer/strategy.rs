//! Load-distribution strategies.
//!
//! A [`Strategy`] is built against a snapshot of the topology and never sees
//! later topology changes; the control plane builds a replacement and
//! publishes it through the [`RoutingTable`](crate::RoutingTable). Only
//! round-robin carries state that selection mutates.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::backend::{BackendId, SharedBackend};
use crate::error::UnknownStrategy;
use crate::load_balancer::hash::hash32;
use crate::load_balancer::ring::{HashRing, DEFAULT_REPLICAS};

/// The four selectable strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    /// Cycle through backends in topology order, ignoring the key.
    RoundRobin,
    /// `backends[hash(key) mod len]`.
    SimpleHash,
    /// Clockwise-nearest replica on a hash ring.
    #[default]
    ConsistentHash,
    /// Pin every key to one backend.
    Static,
}

impl StrategyKind {
    /// Every kind, in display order.
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::RoundRobin,
        StrategyKind::SimpleHash,
        StrategyKind::ConsistentHash,
        StrategyKind::Static,
    ];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::RoundRobin => "round-robin",
            StrategyKind::SimpleHash => "simple-hash",
            StrategyKind::ConsistentHash => "consistent-hash",
            StrategyKind::Static => "static",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "round-robin" | "roundrobin" | "rr" => Ok(StrategyKind::RoundRobin),
            "simple-hash" | "simple" => Ok(StrategyKind::SimpleHash),
            "consistent-hash" | "consistent" | "ch" | "hash" => Ok(StrategyKind::ConsistentHash),
            "static" => Ok(StrategyKind::Static),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Round-robin over the topology in insertion order.
///
/// The cursor is the index of the backend handed out last. A selection advances
/// it by one and returns the backend at the new position, so a fresh rotation
/// starts at the second backend. The cursor always stays in `[0, len)` and is
/// advanced with a single atomic update, so concurrent callers never lose an
/// advance or observe the same slot twice.
#[derive(Debug)]
pub struct RoundRobin {
    backends: Vec<SharedBackend>,
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Start a rotation with the cursor on the first backend.
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        Self {
            backends,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Advance the cursor and hand out the backend it lands on.
    pub fn select(&self) -> Option<SharedBackend> {
        let len = self.backends.len();
        if len == 0 {
            return None;
        }
        let previous = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
        {
            Ok(previous) | Err(previous) => previous,
        };
        Some(self.backends[(previous + 1) % len].clone())
    }

    /// Side-effect-free surrogate for snapshots.
    ///
    /// This is NOT the live rule: it hashes the key to an index instead of
    /// reading the cursor, so a snapshot neither depends on nor disturbs the
    /// rotation.
    pub fn peek(&self, key: &str) -> Option<SharedBackend> {
        hashed_pick(&self.backends, key)
    }

    /// Index of the backend handed out last.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

/// Hash-modulo selection. Stateless.
///
/// Any change in backend count relabels most keys.
#[derive(Debug)]
pub struct SimpleHash {
    backends: Vec<SharedBackend>,
}

impl SimpleHash {
    /// Select over `backends`.
    pub fn new(backends: Vec<SharedBackend>) -> Self {
        Self { backends }
    }

    /// `backends[hash(key) mod len]`.
    pub fn select(&self, key: &str) -> Option<SharedBackend> {
        hashed_pick(&self.backends, key)
    }
}

/// Consistent hashing over a ring of virtual replicas.
#[derive(Debug)]
pub struct ConsistentHash {
    backends: Vec<SharedBackend>,
    ring: HashRing,
}

impl ConsistentHash {
    /// Build the ring for `backends` with `replicas` entries each.
    pub fn new(backends: Vec<SharedBackend>, replicas: usize) -> Self {
        let ring = HashRing::build(&backends, replicas);
        Self { backends, ring }
    }

    /// Route to the clockwise-nearest replica.
    pub fn select(&self, key: &str) -> Option<SharedBackend> {
        self.ring.lookup(key).cloned()
    }

    /// The ring currently routed against.
    pub fn ring(&self) -> &HashRing {
        &self.ring
    }

    /// A ring for `backends`, patched in place when exactly one backend was
    /// added or removed and rebuilt from scratch otherwise. Both paths yield
    /// the same entries.
    fn rebuilt(&self, backends: Vec<SharedBackend>) -> Self {
        let added: Vec<&SharedBackend> = backends
            .iter()
            .filter(|b| !contains(&self.backends, b.id()))
            .collect();
        let removed: Vec<&SharedBackend> = self
            .backends
            .iter()
            .filter(|b| !contains(&backends, b.id()))
            .collect();

        if added.len() + removed.len() != 1 {
            return Self::new(backends, self.ring.replicas());
        }

        let mut ring = self.ring.clone();
        for backend in removed {
            ring.remove(backend.id());
        }
        for backend in added {
            ring.insert(backend);
        }
        Self { backends, ring }
    }
}

/// Every key goes to the backend at one configured index.
#[derive(Debug)]
pub struct Static {
    backends: Vec<SharedBackend>,
    index: usize,
}

impl Static {
    /// Pin to `index`, clamped to the last backend.
    pub fn new(backends: Vec<SharedBackend>, index: usize) -> Self {
        let index = index.min(backends.len().saturating_sub(1));
        Self { backends, index }
    }

    /// The pinned backend, whatever the key.
    pub fn select(&self) -> Option<SharedBackend> {
        self.backends.get(self.index).cloned()
    }

    /// The pinned index.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// One line of a strategy's topology listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyLine {
    /// A backend at an index of the topology order.
    Indexed {
        /// Position in the topology order.
        index: usize,
        /// The backend.
        backend: BackendId,
        /// True for the backend a static strategy is pinned to.
        pinned: bool,
    },
    /// A virtual replica on the ring.
    Placed {
        /// Ring position.
        position: u32,
        /// The owning backend.
        backend: BackendId,
    },
}

impl fmt::Display for TopologyLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyLine::Indexed {
                index,
                backend,
                pinned,
            } => write!(f, "[{index}] {} {backend}", if *pinned { "x" } else { " " }),
            TopologyLine::Placed { position, backend } => write!(f, "[{position:>10}] {backend}"),
        }
    }
}

/// The active routing policy.
#[derive(Debug)]
pub enum Strategy {
    /// See [`RoundRobin`].
    RoundRobin(RoundRobin),
    /// See [`SimpleHash`].
    SimpleHash(SimpleHash),
    /// See [`ConsistentHash`].
    ConsistentHash(ConsistentHash),
    /// See [`Static`].
    Static(Static),
}

impl Strategy {
    /// Build a strategy of `kind` in its default state.
    pub fn new(kind: StrategyKind, backends: Vec<SharedBackend>) -> Self {
        Self::with_replicas(kind, backends, DEFAULT_REPLICAS)
    }

    /// Like [`Strategy::new`], with an explicit ring replica count.
    /// Only consistent-hash uses it.
    pub fn with_replicas(
        kind: StrategyKind,
        backends: Vec<SharedBackend>,
        replicas: usize,
    ) -> Self {
        match kind {
            StrategyKind::RoundRobin => Strategy::RoundRobin(RoundRobin::new(backends)),
            StrategyKind::SimpleHash => Strategy::SimpleHash(SimpleHash::new(backends)),
            StrategyKind::ConsistentHash => {
                Strategy::ConsistentHash(ConsistentHash::new(backends, replicas))
            }
            StrategyKind::Static => Strategy::Static(Static::new(backends, 0)),
        }
    }

    /// Which strategy this is.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::RoundRobin(_) => StrategyKind::RoundRobin,
            Strategy::SimpleHash(_) => StrategyKind::SimpleHash,
            Strategy::ConsistentHash(_) => StrategyKind::ConsistentHash,
            Strategy::Static(_) => StrategyKind::Static,
        }
    }

    /// The backends this strategy selects from, in topology order.
    pub fn backends(&self) -> &[SharedBackend] {
        match self {
            Strategy::RoundRobin(s) => &s.backends,
            Strategy::SimpleHash(s) => &s.backends,
            Strategy::ConsistentHash(s) => &s.backends,
            Strategy::Static(s) => &s.backends,
        }
    }

    /// Select a backend for live traffic. `None` means no backend is
    /// available. Advances the round-robin cursor.
    pub fn select(&self, key: &str) -> Option<SharedBackend> {
        match self {
            Strategy::RoundRobin(s) => s.select(),
            Strategy::SimpleHash(s) => s.select(key),
            Strategy::ConsistentHash(s) => s.select(key),
            Strategy::Static(s) => s.select(),
        }
    }

    /// Select without touching any strategy state, for snapshots.
    ///
    /// Identical to [`Strategy::select`] except for round-robin, which uses
    /// [`RoundRobin::peek`].
    pub fn peek(&self, key: &str) -> Option<SharedBackend> {
        match self {
            Strategy::RoundRobin(s) => s.peek(key),
            Strategy::SimpleHash(s) => s.select(key),
            Strategy::ConsistentHash(s) => s.select(key),
            Strategy::Static(s) => s.select(),
        }
    }

    /// A strategy of the same kind over a new topology snapshot.
    ///
    /// Round-robin restarts its rotation, static keeps its index
    /// clamped to the new length, consistent-hash gets a ring for the new
    /// backends.
    pub fn reinit(&self, backends: Vec<SharedBackend>) -> Strategy {
        match self {
            Strategy::RoundRobin(_) => Strategy::RoundRobin(RoundRobin::new(backends)),
            Strategy::SimpleHash(_) => Strategy::SimpleHash(SimpleHash::new(backends)),
            Strategy::ConsistentHash(s) => Strategy::ConsistentHash(s.rebuilt(backends)),
            Strategy::Static(s) => Strategy::Static(Static::new(backends, s.index)),
        }
    }

    /// List the topology as this strategy sees it: ring entries for
    /// consistent-hash, indexed backends otherwise.
    pub fn describe(&self) -> Vec<TopologyLine> {
        if let Strategy::ConsistentHash(s) = self {
            return s
                .ring
                .entries()
                .iter()
                .map(|e| TopologyLine::Placed {
                    position: e.position,
                    backend: e.backend.id().clone(),
                })
                .collect();
        }

        let pinned = match self {
            Strategy::Static(s) => Some(s.index),
            _ => None,
        };
        self.backends()
            .iter()
            .enumerate()
            .map(|(index, b)| TopologyLine::Indexed {
                index,
                backend: b.id().clone(),
                pinned: pinned == Some(index),
            })
            .collect()
    }
}

fn hashed_pick(backends: &[SharedBackend], key: &str) -> Option<SharedBackend> {
    if backends.is_empty() {
        return None;
    }
    let index = hash32(key) as usize % backends.len();
    Some(backends[index].clone())
}

fn contains(backends: &[SharedBackend], id: &BackendId) -> bool {
    backends.iter().any(|b| b.id() == id)
}
