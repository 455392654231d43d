//! Mock MQTT channel for testing without a real broker.
//!
//! Records every publish, subscribe and unsubscribe call. Publishes are also
//! streamed through [`MockChannel::watch_published`] so a test can play the
//! AWS side and answer requests as they arrive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rumqttc::QoS;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::channel::Channel;
use crate::error::{MqttError, MqttResult};
use crate::router::Router;

/// A recorded publish call.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
}

impl PublishedMessage {
    /// Decode the payload as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

/// Mock implementation of the `Channel` trait.
pub struct MockChannel {
    published: Mutex<Vec<PublishedMessage>>,
    subscriptions: Mutex<Vec<(String, QoS)>>,
    unsubscriptions: Mutex<Vec<String>>,
    fail_publish: AtomicBool,
    fail_subscribe: AtomicBool,
    feed: broadcast::Sender<PublishedMessage>,
}

impl MockChannel {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(256);
        Self {
            published: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            unsubscriptions: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
            fail_subscribe: AtomicBool::new(false),
            feed,
        }
    }

    /// Get all published messages.
    pub fn published(&self) -> Vec<PublishedMessage> {
        lock(&self.published).clone()
    }

    /// Get every subscribe call, in order.
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        lock(&self.subscriptions).clone()
    }

    /// Get every unsubscribe call, in order.
    pub fn unsubscriptions(&self) -> Vec<String> {
        lock(&self.unsubscriptions).clone()
    }

    /// Get the last published message.
    pub fn last_published(&self) -> Option<PublishedMessage> {
        lock(&self.published).last().cloned()
    }

    /// Get published messages for a specific topic.
    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        lock(&self.published)
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Whether `filter` has been subscribed more often than unsubscribed.
    pub fn is_subscribed_to(&self, filter: &str) -> bool {
        let subscribed = lock(&self.subscriptions)
            .iter()
            .filter(|(f, _)| f == filter)
            .count();
        let unsubscribed = lock(&self.unsubscriptions)
            .iter()
            .filter(|f| *f == filter)
            .count();
        subscribed > unsubscribed
    }

    /// Stream of publishes made after this call.
    pub fn watch_published(&self) -> broadcast::Receiver<PublishedMessage> {
        self.feed.subscribe()
    }

    /// Make subsequent publishes fail.
    pub fn fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent subscribes fail.
    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    /// Clear all recorded state.
    pub fn reset(&self) {
        lock(&self.published).clear();
        lock(&self.subscriptions).clear();
        lock(&self.unsubscriptions).clear();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Play the service side: every publish made after this call is passed to
/// `reply`, and each `(topic, body)` it returns is delivered through `router`
/// as if the broker had sent it.
pub fn respond<F>(mock: &MockChannel, router: Arc<Router>, reply: F) -> JoinHandle<()>
where
    F: Fn(&PublishedMessage) -> Vec<(String, Value)> + Send + 'static,
{
    let mut feed = mock.watch_published();
    tokio::spawn(async move {
        while let Ok(msg) = feed.recv().await {
            for (topic, body) in reply(&msg) {
                let payload = serde_json::to_vec(&body).unwrap_or_default();
                router.dispatch(&topic, &payload);
            }
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Channel for MockChannel {
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS) -> MqttResult<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(MqttError::Publish("mock publish failure".into()));
        }
        let message = PublishedMessage {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            qos,
        };
        lock(&self.published).push(message.clone());
        // No receivers is fine.
        let _ = self.feed.send(message);
        Ok(())
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> MqttResult<()> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(MqttError::Subscribe("mock subscribe failure".into()));
        }
        lock(&self.subscriptions).push((filter.to_string(), qos));
        Ok(())
    }

    async fn unsubscribe(&self, filter: &str) -> MqttResult<()> {
        lock(&self.unsubscriptions).push(filter.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_records_messages() {
        let mock = MockChannel::new();
        mock.publish("$aws/things/rpi-001/shadow/get", b"{}", QoS::AtLeastOnce)
            .await
            .unwrap();
        mock.publish("$aws/things/rpi-001/jobs/get", b"", QoS::AtMostOnce)
            .await
            .unwrap();

        let msgs = mock.published();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].topic, "$aws/things/rpi-001/shadow/get");
        assert_eq!(msgs[0].json(), serde_json::json!({}));
        assert_eq!(msgs[1].qos, QoS::AtMostOnce);
        assert_eq!(
            mock.last_published().unwrap().topic,
            "$aws/things/rpi-001/jobs/get"
        );
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_tracking() {
        let mock = MockChannel::new();
        mock.subscribe("$aws/things/+/shadow/#", QoS::AtLeastOnce)
            .await
            .unwrap();
        assert!(mock.is_subscribed_to("$aws/things/+/shadow/#"));
        assert!(!mock.is_subscribed_to("$aws/things/+/jobs/#"));

        mock.unsubscribe("$aws/things/+/shadow/#").await.unwrap();
        assert!(!mock.is_subscribed_to("$aws/things/+/shadow/#"));
        assert_eq!(mock.unsubscriptions().len(), 1);
    }

    #[tokio::test]
    async fn published_to_filter() {
        let mock = MockChannel::new();
        mock.publish("topic/a", b"1", QoS::AtMostOnce).await.unwrap();
        mock.publish("topic/b", b"2", QoS::AtMostOnce).await.unwrap();
        mock.publish("topic/a", b"3", QoS::AtMostOnce).await.unwrap();

        assert_eq!(mock.published_to("topic/a").len(), 2);
    }

    #[tokio::test]
    async fn watch_streams_new_publishes() {
        let mock = MockChannel::new();
        mock.publish("before", b"", QoS::AtMostOnce).await.unwrap();

        let mut feed = mock.watch_published();
        mock.publish("after", b"x", QoS::AtMostOnce).await.unwrap();

        let msg = feed.recv().await.unwrap();
        assert_eq!(msg.topic, "after");
    }

    #[tokio::test]
    async fn responder_answers_through_router() {
        let mock = MockChannel::new();
        let router = Arc::new(Router::new());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        router.add(
            "req/accepted",
            QoS::AtLeastOnce,
            Arc::new(move |_, payload| {
                let _ = tx.send(payload.to_vec());
            }),
        );
        let _responder = respond(&mock, Arc::clone(&router), |msg| {
            vec![(format!("{}/accepted", msg.topic), serde_json::json!({"ok": true}))]
        });

        mock.publish("req", b"{}", QoS::AtLeastOnce).await.unwrap();
        let payload = rx.recv().await.unwrap();
        assert_eq!(payload, br#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn injected_failures() {
        let mock = MockChannel::new();
        mock.fail_publish(true);
        mock.fail_subscribe(true);

        assert!(mock.publish("t", b"", QoS::AtMostOnce).await.is_err());
        assert!(mock.subscribe("t", QoS::AtMostOnce).await.is_err());
        assert!(mock.published().is_empty());

        mock.fail_publish(false);
        assert!(mock.publish("t", b"", QoS::AtMostOnce).await.is_ok());
    }

    #[tokio::test]
    async fn reset_clears_state() {
        let mock = MockChannel::new();
        mock.publish("t", b"d", QoS::AtMostOnce).await.unwrap();
        mock.subscribe("f", QoS::AtLeastOnce).await.unwrap();
        mock.unsubscribe("f").await.unwrap();

        mock.reset();
        assert!(mock.published().is_empty());
        assert!(mock.subscriptions().is_empty());
        assert!(mock.unsubscriptions().is_empty());
    }
}
