//! Tether Admin Control Plane
//!
//! Owns the topology and serializes every mutation of it. Commands arrive on a
//! single channel, are applied one at a time by the control-plane task, and
//! publish a rebuilt strategy to the routing table the data plane reads.
//! Each mutation is reported with the churn it caused on the probe set.

pub mod command;
pub mod console;
pub mod error;
pub mod plane;
pub mod report;

pub use command::{Command, ControlHandle};
pub use error::{ControlError, ParseCommandError};
pub use plane::{ControlPlane, PlaneState};
pub use report::Report;
