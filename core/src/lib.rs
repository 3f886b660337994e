//! Signal-cycling core for live junction monitoring.
//!
//! Live vehicle counts are folded into per-junction demand snapshots, turned into
//! green-time allocations, and consumed by a four-direction cycle whose transitions
//! are reported to a remote signal authority.

pub mod allocation;
pub mod authority;
pub mod control;
pub mod feed_interface;
pub mod feeds;
pub mod prelude;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

pub use prelude::{ControlError, ControlResult, Direction, Junction, JunctionId};
