//! # Sync Engine
//!
//! The sync orchestrator: enumerates active devices, runs bounded-time,
//! failure-isolated concurrent sync per device and advances per-device
//! watermarks. A single reentrancy flag keeps cycles from overlapping and a
//! global kill switch turns the whole engine off.

mod orchestrator;

pub use contracts::{CycleOutcome, CycleReport, DeviceSyncReport};
pub use orchestrator::SyncOrchestrator;
