//! One-shot Greengrass core lookup.

use iot_discovery::{DiscoveryClient, DiscoveryResult};

/// Discover the cores `thing_name` may connect to and log every endpoint.
/// Returns the number of connectivity candidates.
pub async fn run(client: &DiscoveryClient, thing_name: &str) -> DiscoveryResult<usize> {
    let response = client.discover(thing_name).await?;
    let candidates = response.connectivity_candidates();
    if candidates.is_empty() {
        tracing::warn!(thing_name = %thing_name, "no Greengrass core reachable for this thing");
    }
    for candidate in &candidates {
        tracing::info!(
            group_id = ?candidate.group_id,
            core = ?candidate.core_thing_arn,
            host = %candidate.host_address,
            port = candidate.port,
            ca_count = candidate.certificate_authorities.len(),
            "Greengrass core endpoint"
        );
    }
    Ok(candidates.len())
}
