//! End-to-end tests for fleet provisioning by claim.

mod helpers;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use helpers::{Harness, WAIT};
use iot_device_agent::config::ProvisioningConfig;
use iot_device_agent::provisioning::{ProvisioningError, Provisioner};
use iot_mqtt_channel::{MockChannel, MqttError};
use iot_protocol::new_client_token;

struct Scratch(PathBuf);

impl Scratch {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("iot-e2e-{}", new_client_token()));
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self, name: &str) -> String {
        self.0.join(name).display().to_string()
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn provisioning(scratch: &Scratch, serial: &str) -> ProvisioningConfig {
    ProvisioningConfig {
        template_name: "FleetTemplate".into(),
        parameters: HashMap::from([("SerialNumber".to_string(), serial.to_string())]),
        csr_path: None,
        certificate_out: scratch.path("device.pem.crt"),
        private_key_out: Some(scratch.path("private.pem.key")),
    }
}

fn provisioner(harness: &Harness, timeout: Duration) -> Provisioner<MockChannel> {
    Provisioner::new(harness.identity(), timeout)
}

#[tokio::test]
async fn e2e_claim_to_registered_thing() {
    let harness = Harness::start();
    let scratch = Scratch::new();
    let config = provisioning(&scratch, "SN-0042");

    let device = provisioner(&harness, WAIT).provision(&config).await.unwrap();
    assert_eq!(device.certificate_id, "cert-1");
    assert_eq!(device.thing_name.as_deref(), Some("device-SN-0042"));
    assert_eq!(device.device_configuration["fleet"], "alpha");

    let certificate = std::fs::read_to_string(&config.certificate_out).unwrap();
    assert!(certificate.contains("BEGIN CERTIFICATE"));
    let key = std::fs::read_to_string(config.private_key_out.as_ref().unwrap()).unwrap();
    assert!(key.contains("PRIVATE KEY"));

    let registrations = harness.aws.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0]["certificateOwnershipToken"], "ownership-1");
    assert_eq!(registrations[0]["parameters"]["SerialNumber"], "SN-0042");

    // Nothing stays subscribed once provisioning is over.
    assert!(!harness.mqtt.is_subscribed_to("$aws/certificates/create/json/accepted"));
    assert!(!harness.mqtt.is_subscribed_to(
        "$aws/provisioning-templates/FleetTemplate/provision/json/accepted"
    ));
}

#[tokio::test]
async fn e2e_csr_keeps_private_key_local() {
    let harness = Harness::start();
    let scratch = Scratch::new();
    let csr_path = scratch.path("device.csr");
    std::fs::write(&csr_path, "-----BEGIN CERTIFICATE REQUEST-----\nMIIC\n").unwrap();

    let mut config = provisioning(&scratch, "SN-0099");
    config.csr_path = Some(csr_path);
    config.private_key_out = None;

    let device = provisioner(&harness, WAIT).provision(&config).await.unwrap();
    assert_eq!(device.thing_name.as_deref(), Some("device-SN-0099"));
    assert!(std::fs::read_to_string(&config.certificate_out).is_ok());
    assert!(!PathBuf::from(scratch.path("private.pem.key")).exists());

    let sent = harness.mqtt.published_to("$aws/certificates/create-from-csr/json");
    assert_eq!(sent.len(), 1);
    assert!(harness.mqtt.published_to("$aws/certificates/create/json").is_empty());
}

#[tokio::test]
async fn e2e_broker_refusing_publishes() {
    let harness = Harness::start();
    harness.mqtt.fail_publish(true);
    let scratch = Scratch::new();
    let config = provisioning(&scratch, "SN-1");

    let err = provisioner(&harness, Duration::from_millis(100))
        .provision(&config)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ProvisioningError::Mqtt(MqttError::Publish(_))),
        "unexpected error: {err:?}"
    );
    assert!(std::fs::metadata(&config.certificate_out).is_err());
    assert!(!harness.mqtt.is_subscribed_to("$aws/certificates/create/json/rejected"));
}
