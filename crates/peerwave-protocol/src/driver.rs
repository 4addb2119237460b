//! The protocol driver — the periodic loop tying the registry, scheduler,
//! and coordinator together over a radio adapter.
//!
//! A single spawned task owns all protocol state. Receive and completion
//! notifications cross into it over channels, so registry mutation is
//! serialized with the loop's own reads and writes without a lock. The
//! application talks to the loop through a [`DriverHandle`] and observes it
//! through the [`LinkEvent`] channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

use peerwave_transport::{HwAddr, LinkReceivers, RadioAdapter, ReceivedFrame};

use crate::coordinator::{RetryPolicy, SendCoordinator, SendOutcome};
use crate::error::ProtocolError;
use crate::registry::{PeerChange, PeerRegistry};
use crate::scheduler::DiscoveryScheduler;
use crate::wire::{self, FramePayload};

// ── Configuration ─────────────────────────────────────────────────────

/// Configuration for the protocol driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Fixed period of the protocol tick.
    pub tick_interval: Duration,
    /// Silence window after which the active peer is evicted.
    pub peer_timeout: Duration,
    /// Cadence of broadcast discovery probes.
    pub discovery_interval: Duration,
    /// Retry policy for acknowledged sends.
    pub retry: RetryPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1_000),
            peer_timeout: Duration::from_millis(10_000),
            discovery_interval: Duration::from_millis(5_000),
            retry: RetryPolicy::default(),
        }
    }
}

// ── Commands (app → driver) ───────────────────────────────────────────

enum DriverCommand {
    SendCommand {
        text: String,
        reply: oneshot::Sender<Result<SendOutcome, ProtocolError>>,
    },
    GetPeer {
        reply: oneshot::Sender<Option<HwAddr>>,
    },
    Shutdown,
}

// ── Events (driver → app) ─────────────────────────────────────────────

/// Why the active peer was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerLossReason {
    /// No frame arrived within the peer timeout.
    Timeout,
    /// Every delivery attempt toward the peer failed.
    DeliveryExhausted,
}

/// Link-level events the application may want to observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// A peer was adopted.
    PeerDiscovered { address: HwAddr },
    /// A different address took the peer slot.
    PeerReplaced { old: HwAddr, new: HwAddr },
    /// The active peer was dropped; discovery resumes.
    PeerLost {
        address: HwAddr,
        reason: PeerLossReason,
    },
    /// A heartbeat or discovery probe arrived.
    HeartbeatReceived { from: HwAddr, sequence: u64 },
    /// A command frame arrived. Dispatch is the application's business.
    CommandReceived { from: HwAddr, text: String },
}

// ── DriverHandle (app-facing API) ─────────────────────────────────────

/// Handle to a running [`ProtocolDriver`]. Cheap to clone.
#[derive(Clone)]
pub struct DriverHandle {
    cmd_tx: mpsc::Sender<DriverCommand>,
    local: HwAddr,
}

impl DriverHandle {
    /// This node's hardware address.
    pub fn local_address(&self) -> HwAddr {
        self.local
    }

    /// Send `CMD:<text>` to the active peer with acknowledged delivery.
    ///
    /// Blocks until the coordinator settles on an outcome.
    pub async fn send_command(
        &self,
        text: impl Into<String>,
    ) -> Result<SendOutcome, ProtocolError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(DriverCommand::SendCommand {
                text: text.into(),
                reply: tx,
            })
            .await
            .map_err(|_| ProtocolError::DriverClosed)?;
        rx.await.map_err(|_| ProtocolError::DriverClosed)?
    }

    /// The currently active peer, if any.
    pub async fn peer(&self) -> Result<Option<HwAddr>, ProtocolError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(DriverCommand::GetPeer { reply: tx })
            .await
            .map_err(|_| ProtocolError::DriverClosed)?;
        rx.await.map_err(|_| ProtocolError::DriverClosed)
    }

    /// Stop the driver loop.
    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(DriverCommand::Shutdown).await;
    }
}

/// Channels returned to the application when the driver starts.
pub struct DriverChannels {
    /// Handle to command the driver.
    pub handle: DriverHandle,
    /// Link-level events.
    pub events: mpsc::Receiver<LinkEvent>,
}

// ── ProtocolDriver ────────────────────────────────────────────────────

/// The protocol driver — spawn it and observe via channels.
pub struct ProtocolDriver;

impl ProtocolDriver {
    /// Spawn the driver loop over `adapter`.
    ///
    /// `receivers` are the notification channels the link handed out at
    /// attach time. The loop runs until [`DriverHandle::shutdown`].
    pub fn spawn(
        adapter: Arc<dyn RadioAdapter>,
        receivers: LinkReceivers,
        config: DriverConfig,
    ) -> DriverChannels {
        let local = adapter.own_address();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);

        tokio::spawn(driver_loop(adapter, receivers, config, cmd_rx, event_tx));

        DriverChannels {
            handle: DriverHandle { cmd_tx, local },
            events: event_rx,
        }
    }
}

// ── Event loop ────────────────────────────────────────────────────────

async fn driver_loop(
    adapter: Arc<dyn RadioAdapter>,
    receivers: LinkReceivers,
    config: DriverConfig,
    mut cmd_rx: mpsc::Receiver<DriverCommand>,
    event_tx: mpsc::Sender<LinkEvent>,
) {
    let local = adapter.own_address();
    let started = Instant::now();
    let LinkReceivers {
        frames: mut frames_rx,
        reports: reports_rx,
    } = receivers;

    let peer_timeout_ms = config.peer_timeout.as_millis() as u64;
    let mut registry = PeerRegistry::new(local);
    let mut scheduler = DiscoveryScheduler::new(config.discovery_interval.as_millis() as u64);
    let mut coordinator = SendCoordinator::new(Arc::clone(&adapter), reports_rx, config.retry);
    let mut sequence: u64 = 0;

    let mut tick = tokio::time::interval(config.tick_interval);
    // A send can outlast the tick period; catching up in a burst would
    // fire extra heartbeats back to back.
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tick.tick().await; // skip the immediate first tick

    tracing::info!(address = %local, "protocol driver started");

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now_ms = started.elapsed().as_millis() as u64;

                if let Some(evicted) = registry.check_timeout_at(now_ms, peer_timeout_ms) {
                    release_peer(&adapter, evicted).await;
                    tracing::info!(peer = %evicted, "peer timed out");
                    let _ = event_tx.send(LinkEvent::PeerLost {
                        address: evicted,
                        reason: PeerLossReason::Timeout,
                    }).await;
                }

                let payload = wire::encode_heartbeat(local.suffix(), sequence);
                sequence += 1;
                let plan = scheduler.plan_at(now_ms, registry.current());

                if let Some(peer) = plan.heartbeat {
                    tracing::trace!(%peer, "sending heartbeat");
                    if coordinator.send(peer, payload.clone()).await == SendOutcome::Failed {
                        drop_exhausted_peer(&adapter, &mut registry, peer, &event_tx).await;
                    }
                }
                if plan.probe {
                    tracing::trace!("sending discovery probe");
                    if coordinator.send(HwAddr::BROADCAST, payload).await == SendOutcome::Delivered {
                        scheduler.record_probe_at(now_ms);
                    }
                }
            }

            Some(frame) = frames_rx.recv() => {
                let now_ms = started.elapsed().as_millis() as u64;
                handle_frame(frame, now_ms, &adapter, &mut registry, &event_tx).await;
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    DriverCommand::SendCommand { text, reply } => {
                        let result = send_command_to_peer(
                            &text,
                            &adapter,
                            &mut registry,
                            &mut coordinator,
                            &event_tx,
                        ).await;
                        let _ = reply.send(result);
                    }
                    DriverCommand::GetPeer { reply } => {
                        let _ = reply.send(registry.current());
                    }
                    DriverCommand::Shutdown => break,
                }
            }

            else => break,
        }
    }

    tracing::info!(address = %local, "protocol driver stopped");
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn handle_frame(
    frame: ReceivedFrame,
    now_ms: u64,
    adapter: &Arc<dyn RadioAdapter>,
    registry: &mut PeerRegistry,
    event_tx: &mpsc::Sender<LinkEvent>,
) {
    tracing::trace!(from = %frame.source, len = frame.payload.len(), "frame received");

    match registry.on_frame_at(frame.source, now_ms) {
        PeerChange::Adopted { peer } => {
            if let Err(e) = adapter.add_allowed(peer).await {
                tracing::warn!(%peer, "allow-list insert failed: {e}");
            }
            tracing::info!(%peer, "peer found");
            let _ = event_tx
                .send(LinkEvent::PeerDiscovered { address: peer })
                .await;
        }
        PeerChange::Replaced { old, new } => {
            // Remove before add: the allow-list is bounded and rejects
            // duplicates.
            release_peer(adapter, old).await;
            if let Err(e) = adapter.add_allowed(new).await {
                tracing::warn!(peer = %new, "allow-list insert failed: {e}");
            }
            tracing::info!(%old, %new, "peer replaced");
            let _ = event_tx.send(LinkEvent::PeerReplaced { old, new }).await;
        }
        PeerChange::Refreshed | PeerChange::Ignored => {}
    }

    match FramePayload::parse(&frame.payload) {
        FramePayload::Heartbeat { sequence, .. } => {
            let _ = event_tx
                .send(LinkEvent::HeartbeatReceived {
                    from: frame.source,
                    sequence,
                })
                .await;
        }
        FramePayload::Command { text } => {
            let _ = event_tx
                .send(LinkEvent::CommandReceived {
                    from: frame.source,
                    text,
                })
                .await;
        }
        FramePayload::Unknown => {
            tracing::debug!(from = %frame.source, "unrecognized payload");
        }
    }
}

async fn send_command_to_peer(
    text: &str,
    adapter: &Arc<dyn RadioAdapter>,
    registry: &mut PeerRegistry,
    coordinator: &mut SendCoordinator,
    event_tx: &mpsc::Sender<LinkEvent>,
) -> Result<SendOutcome, ProtocolError> {
    let Some(peer) = registry.current() else {
        return Err(ProtocolError::NoActivePeer);
    };
    let payload = wire::encode_command(text)?;
    let outcome = coordinator.send(peer, payload).await;
    if outcome == SendOutcome::Failed {
        drop_exhausted_peer(adapter, registry, peer, event_tx).await;
    }
    Ok(outcome)
}

/// Evict `peer` after retry exhaustion and release it from the allow-list.
async fn drop_exhausted_peer(
    adapter: &Arc<dyn RadioAdapter>,
    registry: &mut PeerRegistry,
    peer: HwAddr,
    event_tx: &mpsc::Sender<LinkEvent>,
) {
    if let Some(evicted) = registry.on_delivery_exhausted(peer) {
        release_peer(adapter, evicted).await;
        tracing::warn!(peer = %evicted, "delivery exhausted, dropping peer");
        let _ = event_tx
            .send(LinkEvent::PeerLost {
                address: evicted,
                reason: PeerLossReason::DeliveryExhausted,
            })
            .await;
    }
}

/// Remove an evicted peer from the transport allow-list.
async fn release_peer(adapter: &Arc<dyn RadioAdapter>, address: HwAddr) {
    if let Err(e) = adapter.remove_allowed(address).await {
        tracing::warn!(%address, "allow-list removal failed: {e}");
    }
}
