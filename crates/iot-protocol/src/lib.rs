//! Shared records and topics for the AWS IoT device services.
//!
//! - `shadow` — Device Shadow requests, responses and events
//! - `jobs` — Jobs requests, responses and events
//! - `identity` — fleet provisioning requests and responses
//! - `discovery` — Greengrass discovery documents
//! - `topics` — reserved topic builders and parser

pub mod discovery;
pub mod identity;
pub mod jobs;
pub mod shadow;
pub mod token;
pub mod topics;

pub use token::new_client_token;
