//! Load balancing: hashing, the consistent hashing ring, the routing strategies
//! and routing-key derivation.

pub mod hash;
pub mod key;
pub mod ring;
pub mod strategy;
