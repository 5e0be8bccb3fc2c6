//! Tether Core functionality.
//!
//! This crate contains the domain models and routing primitives that power the
//! Tether load balancer: the backend topology, the four load-distribution
//! strategies, the consistent hashing ring, and the churn analysis used to
//! observe how many routing keys move when the topology or strategy changes.

pub mod churn;
pub mod domain;
pub mod error;
pub mod load_balancer;

pub use churn::{diff, Diff, DiffRow, ProbeSet, Snapshot};
pub use domain::backend::{Backend, BackendId, SharedBackend};
pub use domain::routing::{RoutingTable, SharedRoutingTable};
pub use domain::topology::Topology;
pub use error::{ParseBackendError, TopologyError, UnknownKeyMode, UnknownStrategy};
pub use load_balancer::key::KeyMode;
pub use load_balancer::ring::{HashRing, RingEntry, DEFAULT_REPLICAS};
pub use load_balancer::strategy::{Strategy, StrategyKind, TopologyLine};
