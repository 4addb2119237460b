use crate::HwAddr;

/// Errors returned by the peerwave transport layer.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error("link init failed: {0}")]
    Init(#[source] anyhow::Error),

    #[error("transmit queue full toward {destination}")]
    QueueFull { destination: HwAddr },

    #[error("{address} is not on the allow-list")]
    UnknownPeer { address: HwAddr },

    #[error("{address} is already on the allow-list")]
    PeerExists { address: HwAddr },

    #[error("allow-list is full (max {max} entries)")]
    AllowListFull { max: usize },

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("link is shut down")]
    Shutdown,

    #[error("invalid hardware address: {0}")]
    InvalidAddress(String),
}
