//! # Ledger
//!
//! The attendance state merger: folds employee-resolved punch events into
//! one ledger row per (employee, local day) under the grace-period policy.
//!
//! The merge is a monotone compare-and-swap, not an append: replaying any
//! event any number of times never moves a check-in later or a check-out
//! earlier.

mod merger;

pub use merger::{AttendanceMerger, MergeOutcome};
