//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Punch timestamps are `chrono::DateTime<Utc>` end to end
//! - The attendance day is derived from a fixed site UTC offset carried by
//!   [`GracePolicy`], never by naive UTC truncation

mod attendance;
mod device;
mod device_id;
mod error;
mod event;
mod plan;
mod stats;
mod store;
mod transport;

pub use attendance::*;
pub use device::*;
pub use device_id::DeviceId;
pub use error::*;
pub use event::*;
pub use plan::*;
pub use stats::*;
pub use store::{LocalSyncStore, SyncStore};
pub use transport::{DeviceTransport, LocalDeviceTransport, TransportFactory};
