//! peerwave protocol core.
//!
//! Single-peer discovery and acknowledged delivery over a broadcast-capable,
//! unreliable radio link. One remote node is tracked at a time; the driver
//! interleaves unicast heartbeats to it with broadcast discovery probes, and
//! every send is retried until the link confirms delivery or the attempt
//! budget runs out.
//!
//! The pieces:
//! - [`PeerRegistry`] — single-slot peer liveness state machine
//! - [`SendCoordinator`] — bounded retries over a fire-and-forget submit
//! - [`DiscoveryScheduler`] — heartbeat/probe interleaving per tick
//! - [`ProtocolDriver`] — the periodic loop tying them together

pub mod coordinator;
pub mod driver;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod wire;

#[cfg(test)]
mod mock;

pub use coordinator::{RetryPolicy, SendCoordinator, SendOutcome};
pub use driver::{
    DriverChannels, DriverConfig, DriverHandle, LinkEvent, PeerLossReason, ProtocolDriver,
};
pub use error::ProtocolError;
pub use registry::{PeerChange, PeerRegistry};
pub use scheduler::{DiscoveryScheduler, TickPlan};
pub use wire::{FramePayload, COMMAND_PREFIX, MAX_PAYLOAD_LEN};

// Re-export the transport types protocol users handle directly.
pub use peerwave_transport::{HwAddr, ReceivedFrame, SendReport};
