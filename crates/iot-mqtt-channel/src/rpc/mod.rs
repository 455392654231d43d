//! Request/response calls on top of the publish/subscribe service clients.
//!
//! AWS IoT answers a request on `{request topic}/accepted` or
//! `{request topic}/rejected`. Every in-flight call registers under its
//! request topic; all calls on that topic share one accepted/rejected
//! subscription pair, created by the first call and released after the last.
//! Responses are paired with calls by `clientToken`.

mod jobs;
mod shadow;

pub use jobs::IotJobsRpcClient;
pub use shadow::IotShadowRpcClient;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rumqttc::QoS;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

use iot_protocol::{new_client_token, topics};

use crate::channel::Channel;
use crate::error::{MqttError, MqttResult};
use crate::router::{MessageHandler, SubscriptionHandle};
use crate::service::MqttServiceClient;

/// How long a call waits for its response unless configured otherwise.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure of a request/response call. `E` is the service's rejected body.
#[derive(Debug, Error)]
pub enum RpcError<E> {
    /// The service answered on the `/rejected` topic.
    #[error("{0}")]
    Rejected(E),

    #[error(transparent)]
    Mqtt(#[from] MqttError),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("operation dropped before a response arrived")]
    Cancelled,
}

/// Fill in a client token when the caller left it empty and return it.
pub(crate) fn assign_token(slot: &mut Option<String>) -> String {
    slot.get_or_insert_with(new_client_token).clone()
}

struct Response {
    accepted: bool,
    payload: Vec<u8>,
}

struct Pending {
    token: String,
    reply: oneshot::Sender<Response>,
}

#[derive(Default)]
struct TopicEntry {
    pending: VecDeque<Pending>,
    handles: Vec<SubscriptionHandle>,
}

type Entries = Arc<Mutex<HashMap<String, TopicEntry>>>;

#[derive(Deserialize)]
struct ClientToken {
    #[serde(rename = "clientToken")]
    client_token: Option<String>,
}

pub(crate) struct RpcEngine<C: Channel> {
    service: MqttServiceClient<C>,
    timeout: Duration,
    entries: Entries,
    /// Serializes registration and release so no call publishes before its
    /// response subscriptions are in place.
    setup: tokio::sync::Mutex<()>,
}

impl<C: Channel> RpcEngine<C> {
    pub(crate) fn new(service: MqttServiceClient<C>, timeout: Duration) -> Self {
        Self {
            service,
            timeout,
            entries: Arc::new(Mutex::new(HashMap::new())),
            setup: tokio::sync::Mutex::new(()),
        }
    }

    /// Publish `request` on `request_topic` and wait for the response that
    /// carries `token`.
    pub(crate) async fn call<R, A, E>(
        &self,
        request_topic: String,
        request: &R,
        token: String,
    ) -> Result<A, RpcError<E>>
    where
        R: Serialize + Sync,
        A: DeserializeOwned,
        E: DeserializeOwned,
    {
        let rx = self.register(&request_topic, token.clone()).await?;

        let published = self
            .service
            .publish_operation(&request_topic, QoS::AtLeastOnce, Some(request))
            .await;
        let outcome = match published {
            Err(e) => Err(RpcError::Mqtt(e)),
            Ok(()) => match tokio::time::timeout(self.timeout, rx).await {
                Ok(Ok(response)) => decode(response),
                Ok(Err(_)) => Err(RpcError::Cancelled),
                Err(_) => {
                    tracing::warn!(topic = %request_topic, token = %token, "request timed out");
                    Err(RpcError::Timeout(self.timeout))
                }
            },
        };

        self.release(&request_topic, &token).await;
        outcome
    }

    async fn register(
        &self,
        request_topic: &str,
        token: String,
    ) -> MqttResult<oneshot::Receiver<Response>> {
        let _setup = self.setup.lock().await;
        let (reply, rx) = oneshot::channel();
        let first = {
            let mut entries = lock(&self.entries);
            let entry = entries.entry(request_topic.to_string()).or_default();
            entry.pending.push_back(Pending { token, reply });
            entry.handles.is_empty()
        };

        if first {
            if let Err(e) = self.subscribe_responses(request_topic).await {
                lock(&self.entries).remove(request_topic);
                return Err(e);
            }
        }
        Ok(rx)
    }

    async fn subscribe_responses(&self, request_topic: &str) -> MqttResult<()> {
        let mut handles = Vec::with_capacity(2);
        for accepted in [true, false] {
            let topic = if accepted {
                topics::accepted(request_topic)
            } else {
                topics::rejected(request_topic)
            };
            let handler = self.response_handler(request_topic, accepted);
            match self
                .service
                .subscribe_raw(&topic, QoS::AtLeastOnce, handler)
                .await
            {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    self.unsubscribe_all(&handles).await;
                    return Err(e);
                }
            }
        }

        if let Some(entry) = lock(&self.entries).get_mut(request_topic) {
            entry.handles = handles;
        }
        Ok(())
    }

    fn response_handler(&self, request_topic: &str, accepted: bool) -> MessageHandler {
        let entries = Arc::clone(&self.entries);
        let key = request_topic.to_string();
        Arc::new(move |topic, payload| {
            let token = serde_json::from_slice::<ClientToken>(payload)
                .ok()
                .and_then(|body| body.client_token);

            let mut entries = lock(&entries);
            let Some(entry) = entries.get_mut(&key) else {
                return;
            };
            entry.pending.retain(|p| !p.reply.is_closed());

            // Responses to other clients' requests carry no token or a
            // token we never issued.
            let index = token
                .as_deref()
                .and_then(|token| entry.pending.iter().position(|p| p.token == token));
            let Some(pending) = index.and_then(|i| entry.pending.remove(i)) else {
                tracing::trace!(topic = %topic, "response matches no pending request");
                return;
            };
            let _ = pending.reply.send(Response {
                accepted,
                payload: payload.to_vec(),
            });
        })
    }

    async fn release(&self, request_topic: &str, token: &str) {
        let _setup = self.setup.lock().await;
        let handles = {
            let mut entries = lock(&self.entries);
            let Some(entry) = entries.get_mut(request_topic) else {
                return;
            };
            entry.pending.retain(|p| p.token != token);
            if !entry.pending.is_empty() {
                return;
            }
            entries
                .remove(request_topic)
                .map(|entry| entry.handles)
                .unwrap_or_default()
        };
        self.unsubscribe_all(&handles).await;
    }

    async fn unsubscribe_all(&self, handles: &[SubscriptionHandle]) {
        for handle in handles {
            if let Err(e) = self.service.unsubscribe(handle).await {
                tracing::warn!(
                    topic = %handle.topic(),
                    error = %e,
                    "failed to release response subscription"
                );
            }
        }
    }
}

fn decode<A, E>(response: Response) -> Result<A, RpcError<E>>
where
    A: DeserializeOwned,
    E: DeserializeOwned,
{
    let malformed =
        |e: serde_json::Error| RpcError::Mqtt(MqttError::Deserialization(e.to_string()));
    if response.accepted {
        return serde_json::from_slice(&response.payload).map_err(malformed);
    }
    let rejected = serde_json::from_slice(&response.payload).map_err(malformed)?;
    Err(RpcError::Rejected(rejected))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
