use std::time::Duration;

use rumqttc::QoS;

use iot_protocol::shadow::*;
use iot_protocol::topics;

use super::{DEFAULT_RPC_TIMEOUT, RpcEngine, RpcError, assign_token};
use crate::channel::Channel;
use crate::error::{MqttResult, require};
use crate::router::SubscriptionHandle;
use crate::service::MqttServiceClient;
use crate::shadow::IotShadowClient;

type ShadowResult<T> = Result<T, RpcError<ErrorResponse>>;

/// Awaitable Device Shadow operations.
pub struct IotShadowRpcClient<C: Channel> {
    shadow: IotShadowClient<C>,
    engine: RpcEngine<C>,
}

impl<C: Channel> IotShadowRpcClient<C> {
    pub fn new(service: MqttServiceClient<C>) -> Self {
        Self::with_timeout(service, DEFAULT_RPC_TIMEOUT)
    }

    pub fn with_timeout(service: MqttServiceClient<C>, timeout: Duration) -> Self {
        Self {
            shadow: IotShadowClient::new(service.clone()),
            engine: RpcEngine::new(service, timeout),
        }
    }

    /// The underlying publish/subscribe client.
    pub fn shadow_client(&self) -> &IotShadowClient<C> {
        &self.shadow
    }

    pub async fn get_shadow(
        &self,
        mut request: GetShadowRequest,
    ) -> ShadowResult<GetShadowResponse> {
        require("thing_name", &request.thing_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::shadow_get(&request.thing_name, None);
        self.engine.call(topic, &request, token).await
    }

    pub async fn update_shadow(
        &self,
        mut request: UpdateShadowRequest,
    ) -> ShadowResult<UpdateShadowResponse> {
        require("thing_name", &request.thing_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::shadow_update(&request.thing_name, None);
        self.engine.call(topic, &request, token).await
    }

    pub async fn delete_shadow(
        &self,
        mut request: DeleteShadowRequest,
    ) -> ShadowResult<DeleteShadowResponse> {
        require("thing_name", &request.thing_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::shadow_delete(&request.thing_name, None);
        self.engine.call(topic, &request, token).await
    }

    pub async fn get_named_shadow(
        &self,
        mut request: GetNamedShadowRequest,
    ) -> ShadowResult<GetShadowResponse> {
        require("thing_name", &request.thing_name)?;
        require("shadow_name", &request.shadow_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::shadow_get(&request.thing_name, Some(&request.shadow_name));
        self.engine.call(topic, &request, token).await
    }

    pub async fn update_named_shadow(
        &self,
        mut request: UpdateNamedShadowRequest,
    ) -> ShadowResult<UpdateShadowResponse> {
        require("thing_name", &request.thing_name)?;
        require("shadow_name", &request.shadow_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::shadow_update(&request.thing_name, Some(&request.shadow_name));
        self.engine.call(topic, &request, token).await
    }

    pub async fn delete_named_shadow(
        &self,
        mut request: DeleteNamedShadowRequest,
    ) -> ShadowResult<DeleteShadowResponse> {
        require("thing_name", &request.thing_name)?;
        require("shadow_name", &request.shadow_name)?;
        let token = assign_token(&mut request.client_token);
        let topic = topics::shadow_delete(&request.thing_name, Some(&request.shadow_name));
        self.engine.call(topic, &request, token).await
    }

    // ─── Event streams (QoS 1) ───

    pub async fn subscribe_to_shadow_delta_updated_events<F>(
        &self,
        request: &ShadowDeltaUpdatedSubscriptionRequest,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowDeltaUpdatedEvent>) + Send + Sync + 'static,
    {
        self.shadow
            .subscribe_to_shadow_delta_updated_events(request, QoS::AtLeastOnce, callback)
            .await
    }

    pub async fn subscribe_to_shadow_updated_events<F>(
        &self,
        request: &ShadowUpdatedSubscriptionRequest,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowUpdatedEvent>) + Send + Sync + 'static,
    {
        self.shadow
            .subscribe_to_shadow_updated_events(request, QoS::AtLeastOnce, callback)
            .await
    }

    pub async fn subscribe_to_named_shadow_delta_updated_events<F>(
        &self,
        request: &NamedShadowDeltaUpdatedSubscriptionRequest,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowDeltaUpdatedEvent>) + Send + Sync + 'static,
    {
        self.shadow
            .subscribe_to_named_shadow_delta_updated_events(request, QoS::AtLeastOnce, callback)
            .await
    }

    pub async fn subscribe_to_named_shadow_updated_events<F>(
        &self,
        request: &NamedShadowUpdatedSubscriptionRequest,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowUpdatedEvent>) + Send + Sync + 'static,
    {
        self.shadow
            .subscribe_to_named_shadow_updated_events(request, QoS::AtLeastOnce, callback)
            .await
    }

    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> MqttResult<()> {
        self.shadow.unsubscribe(handle).await
    }
}
