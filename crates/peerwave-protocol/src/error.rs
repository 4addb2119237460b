use peerwave_transport::RadioError;

/// Protocol-level errors for peerwave.
///
/// Wraps transport errors and adds the few failure modes the driver can
/// surface to its caller. Retry-level failures never appear here — they are
/// absorbed by the send coordinator and reported as a
/// [`SendOutcome`](crate::SendOutcome).
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("transport error: {0}")]
    Transport(#[from] RadioError),

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("no active peer")]
    NoActivePeer,

    #[error("driver is shut down")]
    DriverClosed,
}
