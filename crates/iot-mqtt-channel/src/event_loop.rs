//! MQTT event loop driver.
//!
//! Polls the rumqttc event loop, hands incoming publishes to the router and
//! restores subscriptions when the broker comes back without our session.

use std::time::Duration;

use rumqttc::{Event, EventLoop, Outgoing, Packet};

use iot_protocol::topics;

use crate::channel::Channel;
use crate::router::Router;
use crate::service::MqttServiceClient;

const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Drive the event loop until the client disconnects.
///
/// Intended to be spawned as a background tokio task, or raced against the
/// agent's own loops with `tokio::select!`.
pub async fn run<C: Channel + 'static>(mut eventloop: EventLoop, service: MqttServiceClient<C>) {
    let mut connected_before = false;
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                tracing::info!("MQTT disconnect sent, stopping event loop");
                return;
            }
            Ok(event) => {
                if handle_event(&event, service.router(), &mut connected_before) {
                    // Subscribing inline would block the loop that drains the request queue.
                    let service = service.clone();
                    tokio::spawn(async move {
                        if let Err(e) = service.resubscribe_all().await {
                            tracing::error!(error = %e, "failed to restore subscriptions");
                        }
                    });
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "MQTT event loop error, reconnecting in 5s");
                tokio::time::sleep(RECONNECT_BACKOFF).await;
            }
        }
    }
}

/// Process one event. Returns `true` when routed subscriptions must be
/// re-issued.
pub fn handle_event(event: &Event, router: &Router, connected_before: &mut bool) -> bool {
    match event {
        Event::Incoming(Packet::Publish(publish)) => {
            let handled = router.dispatch(&publish.topic, &publish.payload);
            if handled == 0 {
                tracing::debug!(
                    topic = %publish.topic,
                    parsed = ?topics::parse_topic(&publish.topic),
                    "no handler for incoming message"
                );
            }
            false
        }
        Event::Incoming(Packet::ConnAck(ack)) => {
            let reconnect = std::mem::replace(connected_before, true);
            tracing::info!(
                session_present = ack.session_present,
                reconnect,
                "connected to broker"
            );
            reconnect && !ack.session_present && !router.is_empty()
        }
        _ => false,
    }
}
