//! MQTT service clients for AWS IoT Core.
//!
//! - `Channel` trait for publish/subscribe (mockable in tests)
//! - `MqttChannel` with TLS (mTLS) for production, `MockChannel` for tests
//! - `Router` and `event_loop` for incoming message dispatch
//! - `IotShadowClient`, `IotJobsClient`, `IotIdentityClient`: one method per
//!   service topic
//! - `IotShadowRpcClient`, `IotJobsRpcClient`: awaitable request/response calls

pub mod channel;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod identity;
pub mod jobs;
pub mod mock;
pub mod router;
pub mod rpc;
pub mod service;
pub mod shadow;
pub mod tls;

// Re-exports for convenience.
pub use channel::{Channel, MqttChannel};
pub use config::MqttConfig;
pub use error::{MqttError, MqttResult};
pub use identity::IotIdentityClient;
pub use jobs::IotJobsClient;
pub use mock::MockChannel;
pub use router::{MessageHandler, Router, SubscriptionHandle};
pub use rpc::{DEFAULT_RPC_TIMEOUT, IotJobsRpcClient, IotShadowRpcClient, RpcError};
pub use rumqttc::QoS;
pub use service::MqttServiceClient;
pub use shadow::IotShadowClient;
