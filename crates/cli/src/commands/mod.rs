//! Command implementations.

mod device;
mod info;
mod run;
mod sync;
mod validate;

pub use device::{run_sync_device, run_test_device};
pub use info::run_info;
pub use run::run_service;
pub use sync::run_sync;
pub use validate::run_validate;
