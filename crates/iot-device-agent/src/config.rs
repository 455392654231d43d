//! Device agent configuration, loadable from TOML.

use std::collections::HashMap;

use iot_discovery::DiscoveryConfig;
use iot_mqtt_channel::MqttConfig;
use serde::Deserialize;

/// What the agent does after start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Connect and run shadow sync and the job runner until shut down.
    #[default]
    Device,
    /// Exchange claim credentials for a device certificate, then exit.
    Provision,
    /// Look up Greengrass cores for the thing, then exit.
    Discover,
}

/// Top-level configuration for the device agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub mode: AgentMode,
    /// IoT Core thing name.
    pub thing_name: String,
    /// MQTT connection settings. In provision mode these are the claim credentials.
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub shadow: ShadowConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub provisioning: Option<ProvisioningConfig>,
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
    /// Seconds to wait for a service response.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShadowConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Named shadow to sync. `None` syncs the classic shadow.
    #[serde(default)]
    pub shadow_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How long a simulated job takes to "run".
    #[serde(default = "default_job_duration_ms")]
    pub simulated_duration_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvisioningConfig {
    pub template_name: String,
    /// Parameters passed to the provisioning template.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    /// Sign this CSR instead of having AWS generate a key pair.
    #[serde(default)]
    pub csr_path: Option<String>,
    /// Where to write the issued certificate.
    pub certificate_out: String,
    /// Where to write the generated private key (unused with a CSR).
    #[serde(default)]
    pub private_key_out: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_job_duration_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            shadow_name: None,
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            simulated_duration_ms: default_job_duration_ms(),
        }
    }
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_config() {
        let toml = r#"
thing_name = "rpi-001"

[mqtt]
broker_host = "a1b2c3-ats.iot.us-east-1.amazonaws.com"
client_id = "rpi-001"
client_cert_path = "/etc/iot-device/cert.pem"
client_key_path = "/etc/iot-device/key.pem"
ca_cert_path = "/etc/iot-device/AmazonRootCA1.pem"
"#;
        let config: AgentConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.mode, AgentMode::Device);
        assert_eq!(config.thing_name, "rpi-001");
        assert_eq!(config.mqtt.broker_port, 8883); // default
        assert!(config.mqtt.clean_session);
        assert!(config.shadow.enabled);
        assert!(config.shadow.shadow_name.is_none());
        assert_eq!(config.jobs.simulated_duration_ms, 1000);
        assert_eq!(config.request_timeout_secs, 30);
        assert!(config.provisioning.is_none());
    }

    #[test]
    fn deserialize_provisioning_config() {
        let toml = r#"
mode = "provision"
thing_name = "claim"

[mqtt]
broker_host = "broker.example.com"
broker_port = 443
client_id = "claim-7"
client_cert_path = "/claim/cert.pem"
client_key_path = "/claim/key.pem"
ca_cert_path = "/claim/ca.pem"

[provisioning]
template_name = "FleetTemplate"
certificate_out = "/etc/iot-device/cert.pem"
private_key_out = "/etc/iot-device/key.pem"

[provisioning.parameters]
SerialNumber = "SN-0042"
"#;
        let config: AgentConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.mode, AgentMode::Provision);
        assert_eq!(config.mqtt.broker_port, 443);
        let provisioning = config.provisioning.unwrap();
        assert_eq!(provisioning.template_name, "FleetTemplate");
        assert_eq!(provisioning.parameters["SerialNumber"], "SN-0042");
        assert!(provisioning.csr_path.is_none());
    }

    #[test]
    fn deserialize_discovery_config() {
        let toml = r#"
mode = "discover"
thing_name = "rpi-001"

[mqtt]
broker_host = "unused"
client_id = "rpi-001"

[discovery]
region = "us-west-2"
client_cert_path = "/certs/cert.pem"
client_key_path = "/certs/key.pem"
"#;
        let config: AgentConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.mode, AgentMode::Discover);
        let discovery = config.discovery.unwrap();
        assert_eq!(discovery.region, "us-west-2");
        assert_eq!(discovery.port, 8443);
    }

    #[test]
    fn unknown_mode_rejected() {
        let toml = r#"
mode = "teleport"
thing_name = "rpi-001"

[mqtt]
broker_host = "b"
client_id = "c"
"#;
        assert!(toml::from_str::<AgentConfig>(toml).is_err());
    }
}
