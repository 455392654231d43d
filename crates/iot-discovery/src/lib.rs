//! Greengrass discovery client.
//!
//! Asks the Greengrass discovery API which cores a device may connect to,
//! authenticating with the device's X.509 certificate.

pub mod client;
pub mod config;
pub mod error;

pub use client::DiscoveryClient;
pub use config::DiscoveryConfig;
pub use error::{DiscoveryError, DiscoveryResult};
pub use iot_protocol::discovery::{ConnectivityCandidate, DiscoverResponse};
