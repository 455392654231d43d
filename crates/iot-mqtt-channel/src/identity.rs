//! AWS IoT fleet provisioning (Identity) service client.
//!
//! Used with claim credentials to obtain a device certificate and register
//! the thing from a provisioning template.

use rumqttc::QoS;
use serde::de::DeserializeOwned;

use iot_protocol::identity::*;
use iot_protocol::topics;

use crate::channel::Channel;
use crate::error::{MqttResult, require};
use crate::router::SubscriptionHandle;
use crate::service::MqttServiceClient;

pub struct IotIdentityClient<C: Channel> {
    service: MqttServiceClient<C>,
}

impl<C: Channel> Clone for IotIdentityClient<C> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl<C: Channel> IotIdentityClient<C> {
    pub fn new(service: MqttServiceClient<C>) -> Self {
        Self { service }
    }

    pub fn mqtt_service(&self) -> &MqttServiceClient<C> {
        &self.service
    }

    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) -> MqttResult<()> {
        self.service.unsubscribe(handle).await
    }

    /// The request has no fields; an empty message is published.
    pub async fn publish_create_keys_and_certificate(
        &self,
        _request: &CreateKeysAndCertificateRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        let topic = topics::create_keys_and_certificate();
        self.service.publish_operation::<()>(&topic, qos, None).await
    }

    pub async fn publish_create_certificate_from_csr(
        &self,
        request: &CreateCertificateFromCsrRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        let topic = topics::create_certificate_from_csr();
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn publish_register_thing(
        &self,
        request: &RegisterThingRequest,
        qos: QoS,
    ) -> MqttResult<()> {
        require("template_name", &request.template_name)?;
        let topic = topics::register_thing(&request.template_name);
        self.service.publish_operation(&topic, qos, Some(request)).await
    }

    pub async fn subscribe_to_create_keys_and_certificate_accepted<F>(
        &self,
        _request: &CreateKeysAndCertificateSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<CreateKeysAndCertificateResponse>) + Send + Sync + 'static,
    {
        let topic = topics::accepted(&topics::create_keys_and_certificate());
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_create_keys_and_certificate_rejected<F>(
        &self,
        _request: &CreateKeysAndCertificateSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        let topic = topics::rejected(&topics::create_keys_and_certificate());
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_create_certificate_from_csr_accepted<F>(
        &self,
        _request: &CreateCertificateFromCsrSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<CreateCertificateFromCsrResponse>) + Send + Sync + 'static,
    {
        let topic = topics::accepted(&topics::create_certificate_from_csr());
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_create_certificate_from_csr_rejected<F>(
        &self,
        _request: &CreateCertificateFromCsrSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        let topic = topics::rejected(&topics::create_certificate_from_csr());
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_register_thing_accepted<F>(
        &self,
        request: &RegisterThingSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<RegisterThingResponse>) + Send + Sync + 'static,
    {
        require("template_name", &request.template_name)?;
        let topic = topics::accepted(&topics::register_thing(&request.template_name));
        self.subscribe(&topic, qos, callback).await
    }

    pub async fn subscribe_to_register_thing_rejected<F>(
        &self,
        request: &RegisterThingSubscriptionRequest,
        qos: QoS,
        callback: F,
    ) -> MqttResult<SubscriptionHandle>
    where
        F: Fn(MqttResult<ErrorResponse>) + Send + Sync + 'static,
    {
        require("template_name", &request.template_name)?;
        let topic = topics::rejected(&topics::register_thing(&request.template_name));
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
