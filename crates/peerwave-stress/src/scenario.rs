//! Scenario runners over the in-process radio medium.
//!
//! Each scenario spawns real protocol drivers, lets them run on the wall
//! clock, and prints a JSON summary of what the protocol did.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use peerwave_protocol::{DriverChannels, DriverConfig, LinkEvent, ProtocolDriver, SendOutcome};
use peerwave_transport::{HwAddr, LinkConfig, RadioMedium};

const NODE_A: HwAddr = HwAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const NODE_B: HwAddr = HwAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);

#[derive(Debug, Default, Serialize)]
struct NodeStats {
    discovered: u32,
    replaced: u32,
    lost_timeout: u32,
    lost_delivery: u32,
    heartbeats: u32,
    commands: u32,
    last_sequence: u64,
}

fn spawn_node(
    medium: &RadioMedium,
    address: HwAddr,
    config: &DriverConfig,
) -> anyhow::Result<DriverChannels> {
    let (port, receivers) = medium.attach(address, LinkConfig::new())?;
    tracing::info!(%address, "node up");
    Ok(ProtocolDriver::spawn(Arc::new(port), receivers, config.clone()))
}

/// Consume a node's event stream, logging and tallying until the driver
/// shuts down.
fn spawn_tally(name: &'static str, mut events: mpsc::Receiver<LinkEvent>) -> JoinHandle<NodeStats> {
    tokio::spawn(async move {
        let mut stats = NodeStats::default();
        while let Some(event) = events.recv().await {
            match event {
                LinkEvent::PeerDiscovered { address } => {
                    tracing::info!(node = name, peer = %address, "peer discovered");
                    stats.discovered += 1;
                }
                LinkEvent::PeerReplaced { old, new } => {
                    tracing::info!(node = name, %old, %new, "peer replaced");
                    stats.replaced += 1;
                }
                LinkEvent::PeerLost { address, reason } => {
                    tracing::info!(node = name, peer = %address, ?reason, "peer lost");
                    match reason {
                        peerwave_protocol::PeerLossReason::Timeout => stats.lost_timeout += 1,
                        peerwave_protocol::PeerLossReason::DeliveryExhausted => {
                            stats.lost_delivery += 1
                        }
                    }
                }
                LinkEvent::HeartbeatReceived { from, sequence } => {
                    tracing::debug!(node = name, %from, sequence, "heartbeat");
                    stats.heartbeats += 1;
                    stats.last_sequence = sequence;
                }
                LinkEvent::CommandReceived { from, text } => {
                    tracing::info!(node = name, %from, text, "command received");
                    stats.commands += 1;
                }
            }
        }
        stats
    })
}

pub async fn pair(config: DriverConfig, duration: Duration) -> anyhow::Result<()> {
    let medium = RadioMedium::new();
    let a = spawn_node(&medium, NODE_A, &config)?;
    let b = spawn_node(&medium, NODE_B, &config)?;
    let a_stats = spawn_tally("a", a.events);
    let b_stats = spawn_tally("b", b.events);

    // Give discovery a moment, then exchange a command each way.
    sleep(duration / 2).await;
    for (name, handle) in [("a", &a.handle), ("b", &b.handle)] {
        match handle.send_command("ping").await {
            Ok(SendOutcome::Delivered) => tracing::info!(node = name, "command delivered"),
            Ok(SendOutcome::Failed) => tracing::warn!(node = name, "command failed"),
            Err(e) => tracing::warn!(node = name, "command error: {e}"),
        }
    }
    sleep(duration / 2).await;

    a.handle.shutdown().await;
    b.handle.shutdown().await;

    let summary = serde_json::json!({
        "scenario": "pair",
        "duration_s": duration.as_secs(),
        "a": a_stats.await?,
        "b": b_stats.await?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn failover(
    config: DriverConfig,
    duration: Duration,
    drop_at: Duration,
    recover_at: Duration,
) -> anyhow::Result<()> {
    anyhow::ensure!(drop_at < recover_at, "drop-at must precede recover-at");
    anyhow::ensure!(recover_at < duration, "recover-at must precede the end of the run");

    let medium = RadioMedium::new();
    let a = spawn_node(&medium, NODE_A, &config)?;
    let b = spawn_node(&medium, NODE_B, &config)?;
    let a_stats = spawn_tally("a", a.events);
    let b_stats = spawn_tally("b", b.events);

    sleep(drop_at).await;
    tracing::info!("taking node b offline");
    medium.set_offline(NODE_B, true);

    sleep(recover_at - drop_at).await;
    tracing::info!("bringing node b back");
    medium.set_offline(NODE_B, false);

    sleep(duration - recover_at).await;

    let a_peer = a.handle.peer().await?;
    let b_peer = b.handle.peer().await?;
    a.handle.shutdown().await;
    b.handle.shutdown().await;

    let summary = serde_json::json!({
        "scenario": "failover",
        "duration_s": duration.as_secs(),
        "repaired": a_peer == Some(NODE_B) && b_peer == Some(NODE_A),
        "a": a_stats.await?,
        "b": b_stats.await?,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
