//! MQTT channel: the transport seam under every service client.
//!
//! `MqttChannel` wraps `rumqttc::AsyncClient`. Service clients only see the
//! `Channel` trait, so tests swap in `MockChannel`.

use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};
use crate::tls;

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction for MQTT message publishing and subscribing.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()>;

    /// Remove a topic filter subscription.
    async fn unsubscribe(&self, filter: &str) -> MqttResult<()>;
}

// ── MqttChannel ───────────────────────────────────────────────

/// MQTT channel connected to AWS IoT Core.
///
/// The `EventLoop` is returned separately from the constructors; the caller
/// drives it, normally through [`crate::event_loop::run`].
pub struct MqttChannel {
    client: AsyncClient,
    client_id: String,
}

impl MqttChannel {
    /// Create a channel over mTLS (production mode).
    pub fn new(config: &MqttConfig) -> MqttResult<(Self, EventLoop)> {
        let transport = tls::load_tls_transport(config)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Create a channel for local development (no TLS).
    pub fn new_plaintext(host: &str, port: u16, client_id: &str) -> (Self, EventLoop) {
        let options = base_options(client_id, host, port, 30);
        Self::from_options(options, client_id)
    }

    /// Pick TLS or plaintext from `config.use_tls`.
    pub fn connect(config: &MqttConfig) -> MqttResult<(Self, EventLoop)> {
        if config.use_tls {
            return Self::new(config);
        }
        Ok(Self::with_transport(config, tls::plaintext_transport()))
    }

    fn with_transport(config: &MqttConfig, transport: rumqttc::Transport) -> (Self, EventLoop) {
        let mut options = base_options(
            &config.client_id,
            &config.broker_host,
            config.broker_port,
            config.keepalive_secs,
        );
        options.set_clean_session(config.clean_session);
        options.set_transport(transport);
        Self::from_options(options, &config.client_id)
    }

    fn from_options(options: MqttOptions, client_id: &str) -> (Self, EventLoop) {
        let (client, eventloop) = AsyncClient::new(options, 64);
        (
            Self {
                client,
                client_id: client_id.to_string(),
            },
            eventloop,
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Send DISCONNECT. The event loop stops once it is flushed.
    pub async fn disconnect(&self) -> MqttResult<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| MqttError::Connection(e.to_string()))
    }
}

fn base_options(client_id: &str, host: &str, port: u16, keepalive_secs: u16) -> MqttOptions {
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(Duration::from_secs(keepalive_secs.into()));
    options
}

#[async_trait]
impl Channel for MqttChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| MqttError::Publish(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        self.client
            .subscribe(filter, qos)
            .await
            .map_err(|e| MqttError::Subscribe(e.to_string()))
    }

    async fn unsubscribe(&self, filter: &str) -> MqttResult<()> {
        self.client
            .unsubscribe(filter)
            .await
            .map_err(|e| MqttError::Unsubscribe(e.to_string()))
    }
}
