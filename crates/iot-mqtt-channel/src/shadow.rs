//! AWS IoT Device Shadow service client.
//!
//! One publish method per shadow operation, one subscribe method per response
//! or event topic. Classic and named shadows share the topic scheme under
//! `$aws/things/{thing}/shadow[/name/{shadow}]`.

use rumqttc::QoS;
use serde::de::DeserializeOwned;

use iot_protocol::shadow::*;
use iot_protocol::topics;

use crate::channel::Channel;
use crate::error::{MqttResult, require};
use crate::router::SubscriptionHandle;
use crate::service::MqttServiceClient;

pub struct IotShadowClient<C: Channel> {
    service: MqttServiceClient<C>,
}

impl<C: Channel> Clone for IotShadowClient<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<C: Channel> IotShadowClient<C> {
    pub fn new(service: MqttServiceClient<C>) -> Self {
        Self { service }
    }

    pub fn mqtt_service(&self) -> &MqttServiceClient<C> {
        &self.service
    }

    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> MqttResult<()> {
        self.service.unsubscribe(handle).await
    }

    // ─── Classic shadow ───

    pub async fn publish_get_shadow(&self, request: &GetShadowRequest, qos: QoS) -> MqttResult<()> {
        require("thing_name", &request.thing_name)?;
        let topic = topics::shadow_get(&request.thing_name, None);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_update_shadow(
        &self,
        request: &UpdateShadowRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require("thing_name", &request.thing_name)?;
        let topic = topics::shadow_update(&request.thing_name, None);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_delete_shadow(
        &self,
        request: &DeleteShadowRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require("thing_name", &request.thing_name)?;
        let topic = topics::shadow_delete(&request.thing_name, None);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn subscribe_to_get_shadow_accepted<F>(
        &self,
        request: &GetShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<GetShadowResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::accepted(&topics::shadow_get(&request.thing_name, None));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_get_shadow_rejected<F>(
        &self,
        request: &GetShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::rejected(&topics::shadow_get(&request.thing_name, None));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_update_shadow_accepted<F>(
        &self,
        request: &UpdateShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<UpdateShadowResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::accepted(&topics::shadow_update(&request.thing_name, None));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_update_shadow_rejected<F>(
        &self,
        request: &UpdateShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::rejected(&topics::shadow_update(&request.thing_name, None));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_delete_shadow_accepted<F>(
        &self,
        request: &DeleteShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<DeleteShadowResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::accepted(&topics::shadow_delete(&request.thing_name, None));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_delete_shadow_rejected<F>(
        &self,
        request: &DeleteShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::rejected(&topics::shadow_delete(&request.thing_name, None));
        self.subscribe(&topic, qos, callback).await
    }

    /// Desired/reported differences, published by the service after updates.
    pub async fn subscribe_to_shadow_delta_updated_events<F>(
        &self,
        request: &ShadowDeltaUpdatedSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowDeltaUpdatedEvent>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::shadow_delta(&request.thing_name, None);
        self.subscribe(&topic, qos, callback).await
    }

    /// Previous and current documents after every accepted update.
    pub async fn subscribe_to_shadow_updated_events<F>(
        &self,
        request: &ShadowUpdatedSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowUpdatedEvent>) + Send + Sync + 'static,
    {
        require("thing_name", &request.thing_name)?;
        let topic = topics::shadow_documents(&request.thing_name, None);
        self.subscribe(&topic, qos, callback).await
    }

    // ─── Named shadows ───

    pub async fn publish_get_named_shadow(
        &self,
        request: &GetNamedShadowRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::shadow_get(&request.thing_name, Some(&request.shadow_name));
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_update_named_shadow(
        &self,
        request: &UpdateNamedShadowRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::shadow_update(&request.thing_name, Some(&request.shadow_name));
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_delete_named_shadow(
        &self,
        request: &DeleteNamedShadowRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::shadow_delete(&request.thing_name, Some(&request.shadow_name));
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn subscribe_to_get_named_shadow_accepted<F>(
        &self,
        request: &GetNamedShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<GetShadowResponse>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::accepted(&topics::shadow_get(
            &request.thing_name,
            Some(&request.shadow_name),
        ));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_get_named_shadow_rejected<F>(
        &self,
        request: &GetNamedShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::rejected(&topics::shadow_get(
            &request.thing_name,
            Some(&request.shadow_name),
        ));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_update_named_shadow_accepted<F>(
        &self,
        request: &UpdateNamedShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<UpdateShadowResponse>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::accepted(&topics::shadow_update(
            &request.thing_name,
            Some(&request.shadow_name),
        ));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_update_named_shadow_rejected<F>(
        &self,
        request: &UpdateNamedShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::rejected(&topics::shadow_update(
            &request.thing_name,
            Some(&request.shadow_name),
        ));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_delete_named_shadow_accepted<F>(
        &self,
        request: &DeleteNamedShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<DeleteShadowResponse>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::accepted(&topics::shadow_delete(
            &request.thing_name,
            Some(&request.shadow_name),
        ));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_delete_named_shadow_rejected<F>(
        &self,
        request: &DeleteNamedShadowSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::rejected(&topics::shadow_delete(
            &request.thing_name,
            Some(&request.shadow_name),
        ));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_named_shadow_delta_updated_events<F>(
        &self,
        request: &NamedShadowDeltaUpdatedSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowDeltaUpdatedEvent>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::shadow_delta(&request.thing_name, Some(&request.shadow_name));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_named_shadow_updated_events<F>(
        &self,
        request: &NamedShadowUpdatedSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ShadowUpdatedEvent>) + Send + Sync + 'static,
    {
        require_named(&request.thing_name, &request.shadow_name)?;
        let topic = topics::shadow_documents(&request.thing_name, Some(&request.shadow_name));
        self.subscribe(&topic, qos, callback).await
    }

    async fn subscribe<T, F>(
        &self,
        topic: &str,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        T: DeserializeOwned + 'static,
        F: Fn(MqttResult<T>) + Send + Sync + 'static,
    {
        self.service.subscribe_operation(topic, qos, callback).await
    }
}

fn require_named(thing_name: &str, shadow_name: &str) -> MqttResult<()> {
    require("thing_name", thing_name)?;
    require("shadow_name", shadow_name)
}
