//! Greengrass discovery response records.
//!
//! Field names follow the discovery API (`GGGroups`, `HostAddress`, ...),
//! not the camelCase used by the MQTT services.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverResponse {
    #[serde(rename = "GGGroups")]
    pub gg_groups: Vec<GGGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GGGroup {
    #[serde(rename = "GGGroupId", skip_serializing_if = "Option::is_none")]
    pub gg_group_id: Option<String>,
    #[serde(rename = "Cores")]
    pub cores: Vec<GGCore>,
    /// PEM-encoded CA certificates for the group's cores.
    #[serde(rename = "CAs")]
    pub certificate_authorities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GGCore {
    #[serde(rename = "thingArn", skip_serializing_if = "Option::is_none")]
    pub thing_arn: Option<String>,
    #[serde(rename = "Connectivity")]
    pub connectivity: Vec<ConnectivityInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityInfo {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "HostAddress", skip_serializing_if = "Option::is_none")]
    pub host_address: Option<String>,
    #[serde(rename = "PortNumber", skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "Metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// A single endpoint a device can try, with the CA bundle needed to trust it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityCandidate<'a> {
    pub group_id: Option<&'a str>,
    pub core_thing_arn: Option<&'a str>,
    pub host_address: &'a str,
    pub port: u16,
    pub certificate_authorities: &'a [String],
}

impl DiscoverResponse {
    /// Flatten groups and cores into connection candidates, in response order.
    ///
    /// Entries without a host address are skipped; a missing port falls back
    /// to 8883.
    pub fn connectivity_candidates(&self) -> Vec<ConnectivityCandidate<'_>> {
        let mut candidates = Vec::new();
        for group in &self.gg_groups {
            for core in &group.cores {
                for info in &core.connectivity {
                    let Some(host_address) = info.host_address.as_deref() else {
                        continue;
                    };
                    candidates.push(ConnectivityCandidate {
                        group_id: group.gg_group_id.as_deref(),
                        core_thing_arn: core.thing_arn.as_deref(),
                        host_address,
                        port: info.port.unwrap_or(8883),
                        certificate_authorities: &group.certificate_authorities,
                    });
                }
            }
        }
        candidates
    }
}
