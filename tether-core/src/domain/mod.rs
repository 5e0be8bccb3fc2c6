//! Domain models: backends, the topology that owns them, and the routing table
//! the data plane reads from.

pub mod backend;
pub mod routing;
pub mod topology;
