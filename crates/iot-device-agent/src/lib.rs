//! IoT device agent, library crate.
//!
//! Exposes the agent's building blocks so `iot-e2e-tests` can drive
//! `ShadowSync`, `JobRunner` and `Provisioner` against a mock channel.

pub mod config;
pub mod discover;
pub mod job_runner;
pub mod provisioning;
pub mod shadow_sync;
