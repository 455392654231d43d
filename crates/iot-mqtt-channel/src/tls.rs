//! TLS configuration for mTLS connections to AWS IoT Core.
//!
//! Loads the X.509 device certificate, private key and CA certificate
//! from PEM files and configures rumqttc's TLS transport.

use rumqttc::Transport;

use crate::config::MqttConfig;
use crate::error::{MqttError, MqttResult};

/// ALPN protocol AWS IoT requires for MQTT over mTLS on port 443.
pub const AWS_MQTT_ALPN: &str = "x-amzn-mqtt-ca";

/// Build a TLS transport from certificate file paths in the config.
///
/// Port 443 negotiates [`AWS_MQTT_ALPN`]; every other port connects without ALPN.
pub fn load_tls_transport(config: &MqttConfig) -> MqttResult<Transport> {
    let ca = read_pem("CA cert", &config.ca_cert_path)?;
    let client_cert = read_pem("client cert", &config.client_cert_path)?;
    let client_key = read_pem("client key", &config.client_key_path)?;

    Ok(Transport::tls_with_config(
        rumqttc::TlsConfiguration::Simple {
            ca,
            alpn: alpn_protocols(config.broker_port),
            client_auth: Some((client_cert, client_key)),
        },
    ))
}

/// Plain TCP transport for local brokers.
pub fn plaintext_transport() -> Transport {
    Transport::Tcp
}

fn alpn_protocols(port: u16) -> Option<Vec<Vec<u8>>> {
    (port == 443).then(|| vec![AWS_MQTT_ALPN.as_bytes().to_vec()])
}

fn read_pem(what: &str, path: &str) -> MqttResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| MqttError::Tls(format!("failed to read {what} '{path}': {e}")))
}
