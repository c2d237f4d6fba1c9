//! Change-driven reconciliation of the node set onto helpers

pub mod reconciler;
pub mod schedule;
pub mod scheduler;

pub use reconciler::{Reconciler, TickOutcome};
pub use schedule::Schedule;
pub use scheduler::Scheduler;

#[cfg(test)]
pub(crate) mod testing;
