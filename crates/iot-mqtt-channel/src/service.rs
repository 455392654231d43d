//! Shared publish/subscribe plumbing for the AWS IoT service clients.

use std::sync::Arc;

use rumqttc::QoS;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::channel::Channel;
use crate::error::{MqttError, MqttResult};
use crate::router::{MessageHandler, Router, SubscriptionHandle};

/// Base client that every service client wraps.
///
/// Cheap to clone; clones share the channel, the router and the subscription
/// lock.
pub struct MqttServiceClient<C: Channel> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    channel: Arc<C>,
    router: Arc<Router>,
    /// Held across router + broker updates so the two never disagree.
    subscriptions: Mutex<()>,
}

impl<C: Channel> Clone for MqttServiceClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Channel> MqttServiceClient<C> {
    pub fn new(channel: Arc<C>) -> Self {
        Self::with_router(channel, Arc::new(Router::new()))
    }

    pub fn with_router(channel: Arc<C>, router: Arc<Router>) -> Self {
        Self {
            inner: Arc::new(Inner {
                channel,
                router,
                subscriptions: Mutex::new(()),
            }),
        }
    }

    pub fn channel(&self) -> &Arc<C> {
        &self.inner.channel
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.inner.router
    }

    /// Serialize `payload` as JSON and publish it. `None` publishes an empty
    /// message.
    pub async fn publish_operation<T: Serialize>(
        &self,
        topic: &str,
        qos: QoS,
        payload: Option<&T>,
    ) -> MqttResult<()> {
        let bytes = match payload {
            Some(payload) => serde_json::to_vec(payload)
                .map_err(|e| MqttError::Serialization(e.to_string()))?,
            None => Vec::new(),
        };
        tracing::debug!(topic = %topic, bytes = bytes.len(), "publishing");
        self.inner.channel.publish(topic, &bytes, qos).await
    }

    /// Subscribe and decode every message on `topic` as `T`.
    ///
    /// Payloads that fail to decode reach the callback as
    /// `Err(MqttError::Deserialization)`.
    pub async fn subscribe_operation<T, F>(
        &self,
        topic: &str,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        T: DeserializeOwned + 'static,
        F: Fn(MqttResult<T>) + Send + Sync + 'static,
    {
        let handler: MessageHandler = Arc::new(move |topic, payload| {
            let event = serde_json::from_slice::<T>(payload).map_err(|e| {
                tracing::warn!(topic = %topic, error = %e, "failed to decode message");
                MqttError::Deserialization(format!("{topic}: {e}"))
            });
            callback(event);
        });
        self.subscribe_raw(topic, qos, handler).await
    }

    /// Subscribe with an undecoded handler.
    ///
    /// Only the first handler on a filter subscribes at the broker.
    pub async fn subscribe_raw(
        &self,
        topic: &str,
        qos: QoS,
        handler: MessageHandler,
    ) -> MqttResult<SubscriptionHandle> {
        let _guard = self.inner.subscriptions.lock().await;
        let first = self.inner.router.handler_count(topic) == 0;
        let handle = self.inner.router.add(topic, qos, handler);
        if !first {
            return Ok(handle);
        }

        if let Err(e) = self.inner.channel.subscribe(topic, qos).await {
            self.inner.router.remove(&handle);
            return Err(e);
        }
        tracing::debug!(topic = %topic, "subscribed");
        Ok(handle)
    }

    /// Drop a handler; the broker subscription goes with the last one.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> MqttResult<()> {
        let _guard = self.inner.subscriptions.lock().await;
        if !self.inner.router.remove(handle) {
            return Ok(());
        }
        tracing::debug!(topic = %handle.topic(), "unsubscribing");
        self.inner.channel.unsubscribe(handle.topic()).await
    }

    /// Re-issue every routed subscription, e.g. after a clean-session reconnect.
    pub async fn resubscribe_all(&self) -> MqttResult<()> {
        let _guard = self.inner.subscriptions.lock().await;
        for (filter, qos) in self.inner.router.filters() {
            self.inner.channel.subscribe(&filter, qos).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockChannel;
    use serde::Deserialize;
    use std::sync::Mutex as StdMutex;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Reading {
        value: i64,
    }

    fn client() -> (Arc<MockChannel>, MqttServiceClient<MockChannel>) {
        let mock = Arc::new(MockChannel::new());
        (Arc::clone(&mock), MqttServiceClient::new(mock))
    }

    #[tokio::test]
    async fn publish_serializes_json() {
        let (mock, client) = client();
        client
            .publish_operation("a/b", QoS::AtLeastOnce, Some(&serde_json::json!({"x": 1})))
            .await
            .unwrap();

        let msg = mock.last_published().unwrap();
        assert_eq!(msg.topic, "a/b");
        assert_eq!(msg.payload, br#"{"x":1}"#);
        assert_eq!(msg.qos, QoS::AtLeastOnce);
    }

    #[tokio::test]
    async fn publish_none_sends_empty_payload() {
        let (mock, client) = client();
        client
            .publish_operation::<()>("a/b", QoS::AtMostOnce, None)
            .await
            .unwrap();
        assert!(mock.last_published().unwrap().payload.is_empty());
    }

    #[tokio::test]
    async fn subscribe_decodes_and_reports_bad_payloads() {
        let (mock, client) = client();
        let received = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        client
            .subscribe_operation("a/b", QoS::AtLeastOnce, move |event: MqttResult<Reading>| {
                sink.lock().unwrap().push(event);
            })
            .await
            .unwrap();
        assert!(mock.is_subscribed_to("a/b"));

        client.router().dispatch("a/b", br#"{"value": 7}"#);
        client.router().dispatch("a/b", b"not json");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0], Ok(Reading { value: 7 }));
        assert!(matches!(received[1], Err(MqttError::Deserialization(_))));
    }

    #[tokio::test]
    async fn broker_unsubscribe_waits_for_last_handler() {
        let (mock, client) = client();
        let first = client
            .subscribe_raw("a/b", QoS::AtLeastOnce, Arc::new(|_, _| {}))
            .await
            .unwrap();
        let second = client
            .subscribe_raw("a/b", QoS::AtLeastOnce, Arc::new(|_, _| {}))
            .await
            .unwrap();

        assert_eq!(mock.subscriptions().len(), 1);

        client.unsubscribe(&first).await.unwrap();
        assert!(mock.unsubscriptions().is_empty());
        assert!(mock.is_subscribed_to("a/b"));

        client.unsubscribe(&second).await.unwrap();
        assert_eq!(mock.unsubscriptions(), vec!["a/b".to_string()]);
        assert!(!mock.is_subscribed_to("a/b"));
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_no_route() {
        let (mock, client) = client();
        mock.fail_subscribe(true);

        let err = client
            .subscribe_raw("a/b", QoS::AtLeastOnce, Arc::new(|_, _| {}))
            .await
            .unwrap_err();
        assert!(matches!(err, MqttError::Subscribe(_)));
        assert!(client.router().is_empty());
    }

    #[tokio::test]
    async fn resubscribe_reissues_filters() {
        let (mock, client) = client();
        client
            .subscribe_raw("a/b", QoS::AtLeastOnce, Arc::new(|_, _| {}))
            .await
            .unwrap();
        mock.reset();

        client.resubscribe_all().await.unwrap();
        assert_eq!(
            mock.subscriptions(),
            vec![("a/b".to_string(), QoS::AtLeastOnce)]
        );
    }

    #[tokio::test]
    async fn shared_filter_keeps_broker_qos() {
        let (mock, client) = client();
        client
            .subscribe_raw("a/b", QoS::AtMostOnce, Arc::new(|_, _| {}))
            .await
            .unwrap();
        client
            .subscribe_raw("a/b", QoS::AtLeastOnce, Arc::new(|_, _| {}))
            .await
            .unwrap();
        assert_eq!(mock.subscriptions(), vec![("a/b".to_string(), QoS::AtMostOnce)]);
        mock.reset();

        client.resubscribe_all().await.unwrap();
        assert_eq!(mock.subscriptions(), vec![("a/b".to_string(), QoS::AtMostOnce)]);
    }
}
