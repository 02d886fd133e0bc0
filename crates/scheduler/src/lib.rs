//! # Scheduler
//!
//! Generic periodic-job driver: run a job once immediately, then on a fixed
//! cadence, optionally gated to specific local hours. The cadence is
//! independent of how long a run takes; guarding against overlap is the
//! job's own business (the sync cycle carries a reentrancy flag for exactly
//! that reason).
//!
//! The same driver serves the sync cycle and its sibling reminder jobs.

mod job;
mod runner;

pub use job::{JobSchedule, LocalPeriodicJob, PeriodicJob};
pub use runner::{JobHandle, JobRunner};
