//! # Store
//!
//! In-memory implementation of the [`contracts::SyncStore`] persistence
//! boundary. The CLI seeds it from a [`contracts::SyncPlan`] at boot; tests
//! use it as the standard harness. A deployment with a real registry swaps
//! in its own implementation behind the same trait.

mod memory;

pub use memory::MemoryStore;
