//! Device shadow convergence.
//!
//! Keeps the shadow's `reported` section in step with `desired`: on start-up
//! the current shadow is fetched and any pending delta applied, then every
//! `/update/delta` event is applied locally and reported back.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};

use iot_mqtt_channel::channel::Channel;
use iot_mqtt_channel::{IotShadowRpcClient, MqttResult, RpcError, SubscriptionHandle};
use iot_protocol::shadow::{
    ErrorResponse, GetNamedShadowRequest, GetShadowRequest, GetShadowResponse,
    NamedShadowDeltaUpdatedSubscriptionRequest, ShadowDeltaUpdatedEvent,
    ShadowDeltaUpdatedSubscriptionRequest, ShadowState, UpdateNamedShadowRequest,
    UpdateShadowRequest, UpdateShadowResponse,
};

/// Reported state owned by the device, shared with the rest of the agent.
pub type SharedReportedState = Arc<RwLock<Value>>;

type ShadowResult<T> = Result<T, RpcError<ErrorResponse>>;

pub struct ShadowSync<C: Channel> {
    rpc: IotShadowRpcClient<C>,
    thing_name: String,
    shadow_name: Option<String>,
    reported: SharedReportedState,
}

impl<C: Channel> ShadowSync<C> {
    pub fn new(
        rpc: IotShadowRpcClient<C>,
        thing_name: impl Into<String>,
        shadow_name: Option<String>,
        reported: SharedReportedState,
    ) -> Self {
        Self {
            rpc,
            thing_name: thing_name.into(),
            shadow_name,
            reported,
        }
    }

    pub fn reported(&self) -> &SharedReportedState {
        &self.reported
    }

    /// Subscribe to deltas, converge once, then apply deltas until the
    /// subscription goes away.
    pub async fn run(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let on_delta = move |event: MqttResult<ShadowDeltaUpdatedEvent>| match event {
            Ok(event) => {
                if let Some(state) = event.state {
                    let _ = tx.send((event.version, state));
                }
            }
            Err(e) => tracing::warn!(error = %e, "malformed shadow delta"),
        };

        let handle = match self.subscribe_delta(on_delta).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "failed to subscribe to shadow deltas");
                return;
            }
        };

        if let Err(e) = self.sync_once().await {
            tracing::warn!(error = %e, "initial shadow sync failed");
        }

        while let Some((version, delta)) = rx.recv().await {
            tracing::info!(version = ?version, "shadow delta received");
            if let Err(e) = self.apply_delta(delta).await {
                tracing::warn!(error = %e, "failed to report shadow delta");
            }
        }

        if let Err(e) = self.rpc.unsubscribe(&handle).await {
            tracing::debug!(error = %e, "failed to drop delta subscription");
        }
    }

    /// Fetch the shadow and apply its pending delta. A missing shadow is
    /// created from the local reported state.
    pub async fn sync_once(&self) -> ShadowResult<()> {
        match self.get().await {
            Ok(shadow) => {
                let delta = shadow.state.and_then(|state| state.delta);
                match delta {
                    Some(delta) => self.apply_delta(delta).await.map(|_| ()),
                    None => {
                        tracing::debug!(version = ?shadow.version, "shadow already in sync");
                        Ok(())
                    }
                }
            }
            Err(RpcError::Rejected(rejected)) if rejected.code == Some(404) => {
                tracing::info!(
                    thing_name = %self.thing_name,
                    "no shadow yet, reporting current state"
                );
                let current = self.reported.read().await.clone();
                self.update(current).await.map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    /// Take on `delta` locally and report it.
    pub async fn apply_delta(&self, delta: Value) -> ShadowResult<UpdateShadowResponse> {
        merge_reported(&mut *self.reported.write().await, &delta);
        let response = self.update(delta).await?;
        tracing::info!(version = ?response.version, "reported state updated");
        Ok(response)
    }

    async fn get(&self) -> ShadowResult<GetShadowResponse> {
        match &self.shadow_name {
            Some(name) => {
                self.rpc
                    .get_named_shadow(GetNamedShadowRequest::new(&self.thing_name, name))
                    .await
            }
            None => self.rpc.get_shadow(GetShadowRequest::new(&self.thing_name)).await,
        }
    }

    async fn update(&self, reported: Value) -> ShadowResult<UpdateShadowResponse> {
        let state = ShadowState::reported(reported);
        match &self.shadow_name {
            Some(name) => {
                self.rpc
                    .update_named_shadow(UpdateNamedShadowRequest::new(
                        &self.thing_name,
                        name,
                        state,
                    ))
                    .await
            }
            None => {
                self.rpc
                    .update_shadow(UpdateShadowRequest::new(&self.thing_name, state))
                    .await
            }
        }
    }

    async fn subscribe_delta<F>(&self, callback: F) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowDeltaUpdatedEvent>) + Send + Sync + 'static,
    {
        match &self.shadow_name {
            Some(name) => {
                let request =
                    NamedShadowDeltaUpdatedSubscriptionRequest::new(&self.thing_name, name);
                self.rpc
                    .subscribe_to_named_shadow_delta_updated_events(&request, callback)
                    .await
            }
            None => {
                let request = ShadowDeltaUpdatedSubscriptionRequest::new(&self.thing_name);
                self.rpc
                    .subscribe_to_shadow_delta_updated_events(&request, callback)
                    .await
            }
        }
    }
}

/// JSON merge patch: objects merge recursively, `null` removes a key and
/// anything else replaces the target.
pub fn merge_reported(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_reported(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
