//! # Device Gateway
//!
//! Vendor transport implementations behind the [`contracts::DeviceTransport`]
//! capability set, plus the type-tag factory that selects one per registry
//! row.
//!
//! Each transport privately owns its connection state; abandoning a
//! transport future (the orchestrator's timeout does exactly that) drops the
//! underlying socket or HTTP client with it.

mod cloud_punch;
mod factory;
mod http_pull;
mod mock;
mod zk_net;

pub use cloud_punch::CloudPunchTransport;
pub use factory::{DeviceGateway, VendorFactory};
pub use http_pull::HttpPullTransport;
pub use mock::{CallLog, MockFactory, MockScript, MockTransport};
pub use zk_net::ZkNetTransport;
