use serde::Deserialize;

/// Discovery endpoint and device credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// AWS region of the Greengrass group (e.g., `us-east-1`).
    pub region: String,
    /// Path to device X.509 certificate (PEM).
    pub client_cert_path: String,
    /// Path to device private key (PEM).
    pub client_key_path: String,
    /// Path to CA certificate. Empty uses the built-in web PKI roots.
    #[serde(default)]
    pub ca_cert_path: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_port() -> u16 {
    8443
}

fn default_connect_timeout_ms() -> u64 {
    3000
}

impl DiscoveryConfig {
    /// Base URL of the regional discovery service.
    pub fn endpoint(&self) -> String {
        format!(
            "https://greengrass-ats.iot.{}.amazonaws.com:{}",
            self.region, self.port
        )
    }
}
