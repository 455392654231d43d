use std::time::Duration;

use iot_protocol::discovery::DiscoverResponse;

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, DiscoveryResult};

/// Client for `GET /greengrass/discover/thing/{thing}`.
pub struct DiscoveryClient {
    client: reqwest::Client,
    endpoint: String,
}

impl DiscoveryClient {
    /// Build an mTLS client for the regional discovery endpoint.
    pub fn new(config: &DiscoveryConfig) -> DiscoveryResult<Self> {
        let mut identity_pem = read_pem("client cert", &config.client_cert_path)?;
        identity_pem.push(b'\n');
        identity_pem.extend(read_pem("client key", &config.client_key_path)?);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| DiscoveryError::Tls(format!("invalid client identity: {e}")))?;

        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .identity(identity)
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms));

        if !config.ca_cert_path.is_empty() {
            let ca = read_pem("CA cert", &config.ca_cert_path)?;
            let ca = reqwest::Certificate::from_pem(&ca)
                .map_err(|e| DiscoveryError::Tls(format!("invalid CA cert: {e}")))?;
            builder = builder.add_root_certificate(ca);
        }

        let client = builder.build()?;
        Ok(Self::from_client(client, config.endpoint()))
    }

    /// Use a prepared HTTP client against `endpoint`.
    pub fn from_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Target another base URL, keeping the HTTP client.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Look up the Greengrass cores `thing_name` may connect to.
    pub async fn discover(&self, thing_name: &str) -> DiscoveryResult<DiscoverResponse> {
        if thing_name.is_empty() {
            return Err(DiscoveryError::InvalidRequest(
                "thing_name is required".into(),
            ));
        }

        let url = format!(
            "{}/greengrass/discover/thing/{thing_name}",
            self.endpoint.trim_end_matches('/')
        );
        tracing::debug!(url = %url, "requesting discovery");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            tracing::warn!(thing_name = %thing_name, status = %status, "discovery rejected");
            return Err(DiscoveryError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        let discovered: DiscoverResponse =
            serde_json::from_str(&body).map_err(|e| DiscoveryError::Decode(e.to_string()))?;
        tracing::info!(
            thing_name = %thing_name,
            groups = discovered.gg_groups.len(),
            "discovery complete"
        );
        Ok(discovered)
    }
}

fn read_pem(what: &str, path: &str) -> DiscoveryResult<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| DiscoveryError::Tls(format!("failed to read {what} '{path}': {e}")))
}
