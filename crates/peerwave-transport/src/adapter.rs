use async_trait::async_trait;
use bytes::Bytes;

use crate::{HwAddr, RadioError};

/// Radio link contract consumed by the protocol driver.
///
/// In production this is a binding to the radio driver; in tests and
/// simulations it is a [`RadioPort`](crate::RadioPort) on an in-process
/// [`RadioMedium`](crate::RadioMedium).
#[async_trait]
pub trait RadioAdapter: Send + Sync {
    /// This node's own hardware address.
    fn own_address(&self) -> HwAddr;

    /// Permit frame exchange with `address`.
    ///
    /// The allow-list is bounded and rejects duplicates; the broadcast
    /// sentinel is permanently allowed and cannot be added or removed.
    async fn add_allowed(&self, address: HwAddr) -> Result<(), RadioError>;

    /// Revoke `address` from the allow-list.
    async fn remove_allowed(&self, address: HwAddr) -> Result<(), RadioError>;

    /// Queue one frame for transmission.
    ///
    /// Returns as soon as the frame is accepted by the link; the delivery
    /// outcome arrives later as a [`SendReport`](crate::SendReport) on the
    /// report channel.
    async fn submit(&self, destination: HwAddr, payload: Bytes) -> Result<(), RadioError>;
}
