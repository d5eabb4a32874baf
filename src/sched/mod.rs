// src/sched/mod.rs

//! Ingestion scheduling.
//!
//! - [`queue`] holds the pending queue and working set containers.
//! - [`scheduler`] contains the admission/completion state machine.
//! - [`sweeper`] runs the periodic reconciliation sweep.

pub mod queue;
pub mod scheduler;
pub mod sweeper;

pub use queue::{PendingQueue, Priority, WorkingSet};
pub use scheduler::{DrainSummary, Scheduler, SharedScheduler};
pub use sweeper::spawn_sweeper;
