//! Fleet provisioning by claim.
//!
//! Connected with claim credentials, the agent obtains a device certificate
//! (AWS-generated keys, or a local CSR), stores it and registers the thing
//! through a provisioning template.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use iot_mqtt_channel::channel::Channel;
use iot_mqtt_channel::{IotIdentityClient, MqttError, MqttResult, QoS, SubscriptionHandle};
use iot_protocol::identity::{
    CreateCertificateFromCsrRequest, CreateCertificateFromCsrResponse,
    CreateCertificateFromCsrSubscriptionRequest, CreateKeysAndCertificateRequest,
    CreateKeysAndCertificateResponse, CreateKeysAndCertificateSubscriptionRequest, ErrorResponse,
    RegisterThingRequest, RegisterThingResponse, RegisterThingSubscriptionRequest,
};

use crate::config::ProvisioningConfig;

#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error(transparent)]
    Rejected(ErrorResponse),

    #[error("no {0} response within {1:?}")]
    Timeout(&'static str, Duration),

    #[error(transparent)]
    Mqtt(#[from] MqttError),

    #[error("response is missing {0}")]
    Incomplete(&'static str),

    #[error("invalid provisioning config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;

/// Outcome of a successful provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedDevice {
    pub certificate_id: String,
    pub thing_name: Option<String>,
    pub device_configuration: HashMap<String, String>,
}

struct IssuedCertificate {
    certificate_id: String,
    ownership_token: String,
    certificate_pem: String,
    private_key: Option<String>,
}

/// Single-use reply slot shared by an accepted and a rejected handler.
struct Slot<T> {
    tx: Arc<Mutex<Option<oneshot::Sender<ProvisioningResult<T>>>>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T> Slot<T> {
    fn new() -> (Self, oneshot::Receiver<ProvisioningResult<T>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    fn fill(&self, value: ProvisioningResult<T>) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            let _ = tx.send(value);
        }
    }

    fn accept(&self, response: MqttResult<T>) {
        self.fill(response.map_err(ProvisioningError::Mqtt));
    }

    fn reject(&self, response: MqttResult<ErrorResponse>) {
        self.fill(Err(match response {
            Ok(rejected) => ProvisioningError::Rejected(rejected),
            Err(e) => ProvisioningError::Mqtt(e),
        }));
    }
}

pub struct Provisioner<C: Channel> {
    identity: IotIdentityClient<C>,
    timeout: Duration,
}

impl<C: Channel> Provisioner<C> {
    pub fn new(identity: IotIdentityClient<C>, timeout: Duration) -> Self {
        Self { identity, timeout }
    }

    /// Obtain a certificate, write it out and register the thing.
    pub async fn provision(
        &self,
        config: &ProvisioningConfig,
    ) -> ProvisioningResult<ProvisionedDevice> {
        if config.template_name.is_empty() {
            return Err(ProvisioningError::Config("template_name is required".into()));
        }
        if config.csr_path.is_none() && config.private_key_out.is_none() {
            return Err(ProvisioningError::Config(
                "private_key_out is required when AWS generates the key".into(),
            ));
        }

        let issued = match &config.csr_path {
            Some(csr_path) => {
                let csr = std::fs::read_to_string(csr_path)?;
                self.create_certificate_from_csr(csr).await?
            }
            None => self.create_keys_and_certificate().await?,
        };
        tracing::info!(certificate_id = %issued.certificate_id, "certificate issued");

        write_secret(&config.certificate_out, &issued.certificate_pem)?;
        if let (Some(path), Some(key)) = (&config.private_key_out, &issued.private_key) {
            write_secret(path, key)?;
        }

        let registered = self
            .register_thing(
                &config.template_name,
                issued.ownership_token,
                config.parameters.clone(),
            )
            .await?;
        tracing::info!(
            thing_name = ?registered.thing_name,
            template = %config.template_name,
            "thing registered"
        );

        Ok(ProvisionedDevice {
            certificate_id: issued.certificate_id,
            thing_name: registered.thing_name,
            device_configuration: registered.device_configuration.unwrap_or_default(),
        })
    }

    async fn create_keys_and_certificate(&self) -> ProvisioningResult<IssuedCertificate> {
        let (accepted, rx) = Slot::<CreateKeysAndCertificateResponse>::new();
        let rejected = accepted.clone();
        let request = CreateKeysAndCertificateSubscriptionRequest;
        let response = self
            .exchange(
                "CreateKeysAndCertificate",
                rx,
                self.identity.subscribe_to_create_keys_and_certificate_accepted(
                    &request,
                    QoS::AtLeastOnce,
                    move |r| accepted.accept(r),
                ),
                self.identity.subscribe_to_create_keys_and_certificate_rejected(
                    &request,
                    QoS::AtLeastOnce,
                    move |r| rejected.reject(r),
                ),
                self.identity.publish_create_keys_and_certificate(
                    &CreateKeysAndCertificateRequest,
                    QoS::AtLeastOnce,
                ),
            )
            .await?;

        let private_key = response
            .private_key
            .ok_or(ProvisioningError::Incomplete("privateKey"))?;
        issued(
            response.certificate_id,
            response.certificate_ownership_token,
            response.certificate_pem,
            Some(private_key),
        )
    }

    async fn create_certificate_from_csr(
        &self,
        csr: String,
    ) -> ProvisioningResult<IssuedCertificate> {
        let (accepted, rx) = Slot::<CreateCertificateFromCsrResponse>::new();
        let rejected = accepted.clone();
        let request = CreateCertificateFromCsrSubscriptionRequest;
        let publish = CreateCertificateFromCsrRequest::new(csr);
        let response = self
            .exchange(
                "CreateCertificateFromCsr",
                rx,
                self.identity.subscribe_to_create_certificate_from_csr_accepted(
                    &request,
                    QoS::AtLeastOnce,
                    move |r| accepted.accept(r),
                ),
                self.identity.subscribe_to_create_certificate_from_csr_rejected(
                    &request,
                    QoS::AtLeastOnce,
                    move |r| rejected.reject(r),
                ),
                self.identity
                    .publish_create_certificate_from_csr(&publish, QoS::AtLeastOnce),
            )
            .await?;

        issued(
            response.certificate_id,
            response.certificate_ownership_token,
            response.certificate_pem,
            None,
        )
    }

    async fn register_thing(
        &self,
        template_name: &str,
        ownership_token: String,
        parameters: HashMap<String, String>,
    ) -> ProvisioningResult<RegisterThingResponse> {
        let (accepted, rx) = Slot::<RegisterThingResponse>::new();
        let rejected = accepted.clone();
        let request = RegisterThingSubscriptionRequest::new(template_name);
        let mut register = RegisterThingRequest::new(template_name, ownership_token);
        if !parameters.is_empty() {
            register.parameters = Some(parameters);
        }
        self.exchange(
            "RegisterThing",
            rx,
            self.identity
                .subscribe_to_register_thing_accepted(&request, QoS::AtLeastOnce, move |r| {
                    accepted.accept(r)
                }),
            self.identity
                .subscribe_to_register_thing_rejected(&request, QoS::AtLeastOnce, move |r| {
                    rejected.reject(r)
                }),
            self.identity.publish_register_thing(&register, QoS::AtLeastOnce),
        )
        .await
    }

    /// Subscribe to both outcomes, publish, wait for the reply and release
    /// the subscriptions whatever happened.
    async fn exchange<T>(
        &self,
        operation: &'static str,
        rx: oneshot::Receiver<ProvisioningResult<T>>,
        subscribe_accepted: impl Future<Output = MqttResult<SubscriptionHandle>>,
        subscribe_rejected: impl Future<Output = MqttResult<SubscriptionHandle>>,
        publish: impl Future<Output = MqttResult<()>>,
    ) -> ProvisioningResult<T> {
        let mut handles = vec![subscribe_accepted.await?];
        let outcome: ProvisioningResult<T> = async {
            handles.push(subscribe_rejected.await?);
            publish.await?;
            self.wait(operation, rx).await
        }
        .await;
        self.release(&handles).await;
        outcome
    }

    async fn wait<T>(
        &self,
        operation: &'static str,
        rx: oneshot::Receiver<ProvisioningResult<T>>,
    ) -> ProvisioningResult<T> {
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(operation, "provisioning request timed out");
                Err(ProvisioningError::Timeout(operation, self.timeout))
            }
        }
    }

    async fn release(&self, handles: &[SubscriptionHandle]) {
        for handle in handles {
            if let Err(e) = self.identity.unsubscribe(handle).await {
                tracing::debug!(topic = %handle.topic(), error = %e, "failed to unsubscribe");
            }
        }
    }
}

fn issued(
    certificate_id: Option<String>,
    ownership_token: Option<String>,
    certificate_pem: Option<String>,
    private_key: Option<String>,
) -> ProvisioningResult<IssuedCertificate> {
    Ok(IssuedCertificate {
        certificate_id: certificate_id.ok_or(ProvisioningError::Incomplete("certificateId"))?,
        ownership_token: ownership_token
            .ok_or(ProvisioningError::Incomplete("certificateOwnershipToken"))?,
        certificate_pem: certificate_pem.ok_or(ProvisioningError::Incomplete("certificatePem"))?,
        private_key,
    })
}

fn write_secret(path: &str, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    tracing::debug!(path = %path, "credential written");
    Ok(())
}
