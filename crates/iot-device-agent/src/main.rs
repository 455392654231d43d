//! IoT device agent: keeps the device shadow in sync, works through AWS IoT
//! Jobs, provisions itself by claim and looks up Greengrass cores.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

use iot_device_agent::config::{AgentConfig, AgentMode};
use iot_device_agent::discover;
use iot_device_agent::job_runner::JobRunner;
use iot_device_agent::provisioning::Provisioner;
use iot_device_agent::shadow_sync::{SharedReportedState, ShadowSync};
use iot_discovery::DiscoveryClient;
use iot_mqtt_channel::{
    IotIdentityClient, IotJobsRpcClient, IotShadowRpcClient, MqttChannel, MqttServiceClient,
    event_loop,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "iot-device-agent starting");

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/iot-device/agent.toml".to_string());

    let config = AgentConfig::from_file(&config_path)?;
    tracing::info!(thing_name = %config.thing_name, mode = ?config.mode, "config loaded");

    match config.mode {
        AgentMode::Device => run_device(&config).await,
        AgentMode::Provision => run_provision(&config).await,
        AgentMode::Discover => run_discover(&config).await,
    }
}

async fn run_device(config: &AgentConfig) -> anyhow::Result<()> {
    let (channel, eventloop) = MqttChannel::connect(&config.mqtt)?;
    let channel = Arc::new(channel);
    let service = MqttServiceClient::new(Arc::clone(&channel));
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let reported: SharedReportedState = Arc::new(RwLock::new(serde_json::json!({
        "agent_version": env!("CARGO_PKG_VERSION"),
    })));
    let shadow = ShadowSync::new(
        IotShadowRpcClient::with_timeout(service.clone(), timeout),
        &config.thing_name,
        config.shadow.shadow_name.clone(),
        reported,
    );
    let jobs = JobRunner::new(
        IotJobsRpcClient::with_timeout(service.clone(), timeout),
        &config.thing_name,
        Duration::from_millis(config.jobs.simulated_duration_ms),
    );

    tracing::info!(
        shadow = config.shadow.enabled,
        jobs = config.jobs.enabled,
        "iot-device-agent ready"
    );

    tokio::select! {
        () = event_loop::run(eventloop, service.clone()) => {
            tracing::error!("MQTT event loop exited unexpectedly");
        }
        () = shadow.run(), if config.shadow.enabled => {
            tracing::error!("shadow sync exited unexpectedly");
        }
        () = jobs.run(), if config.jobs.enabled => {
            tracing::error!("job runner exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Err(e) = channel.disconnect().await {
        tracing::warn!(error = %e, "disconnect failed");
    }
    tracing::info!("iot-device-agent stopped");
    Ok(())
}

async fn run_provision(config: &AgentConfig) -> anyhow::Result<()> {
    let provisioning = config
        .provisioning
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("mode = \"provision\" needs a [provisioning] section"))?;

    let (channel, eventloop) = MqttChannel::connect(&config.mqtt)?;
    let channel = Arc::new(channel);
    let service = MqttServiceClient::new(Arc::clone(&channel));
    let driver = tokio::spawn(event_loop::run(eventloop, service.clone()));

    let provisioner = Provisioner::new(
        IotIdentityClient::new(service),
        Duration::from_secs(config.request_timeout_secs),
    );
    let outcome = provisioner.provision(provisioning).await;

    if let Err(e) = channel.disconnect().await {
        tracing::warn!(error = %e, "disconnect failed");
    }
    // A loop stuck reconnecting never sees the disconnect.
    if tokio::time::timeout(Duration::from_secs(5), driver).await.is_err() {
        tracing::warn!("event loop did not stop after disconnect");
    }

    let device = outcome?;
    tracing::info!(
        certificate_id = %device.certificate_id,
        thing_name = ?device.thing_name,
        "provisioning complete"
    );
    Ok(())
}

async fn run_discover(config: &AgentConfig) -> anyhow::Result<()> {
    let discovery = config
        .discovery
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("mode = \"discover\" needs a [discovery] section"))?;
    let client = DiscoveryClient::new(discovery)?;
    let found = discover::run(&client, &config.thing_name).await?;
    tracing::info!(candidates = found, "discovery finished");
    Ok(())
}
