//! peerwave transport seam.
//!
//! Defines the contract between the protocol core and the radio link: the
//! 6-byte hardware address, the frame and completion-report types, and the
//! [`RadioAdapter`] trait the driver talks to. Ships [`RadioMedium`], an
//! in-process radio medium implementing the same contract for tests,
//! simulations, and the stress binary — the physical radio driver itself
//! lives outside this repository.
//!
//! # Quick start
//!
//! ```rust
//! use bytes::Bytes;
//! use peerwave_transport::{HwAddr, LinkConfig, RadioAdapter, RadioMedium};
//!
//! # async fn example() -> Result<(), peerwave_transport::RadioError> {
//! let medium = RadioMedium::new();
//! let addr: HwAddr = "02:00:00:00:00:01".parse()?;
//! let (port, mut rx) = medium.attach(addr, LinkConfig::new())?;
//!
//! port.submit(HwAddr::BROADCAST, Bytes::from_static(b"0001_0")).await?;
//! let report = rx.reports.recv().await.expect("medium closed");
//! assert!(report.success);
//! # Ok(())
//! # }
//! ```

mod adapter;
mod config;
mod error;
mod frame;
mod link;

pub use adapter::RadioAdapter;
pub use config::LinkConfig;
pub use error::RadioError;
pub use frame::{LinkReceivers, ReceivedFrame, SendReport};
pub use link::{RadioMedium, RadioPort};

use std::fmt;
use std::str::FromStr;

/// A 6-byte link-layer hardware address.
///
/// Displayed and parsed as colon-separated hex (`02:00:00:00:00:01`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HwAddr([u8; 6]);

impl HwAddr {
    /// The all-ones broadcast sentinel.
    pub const BROADCAST: HwAddr = HwAddr([0xFF; 6]);

    /// Create from raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        HwAddr(octets)
    }

    /// The raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The last two octets — used as the short identity in wire payloads.
    pub const fn suffix(&self) -> [u8; 2] {
        [self.0[4], self.0[5]]
    }

    /// Whether this is the broadcast sentinel.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

impl fmt::Debug for HwAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HwAddr({self})")
    }
}

impl FromStr for HwAddr {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');
        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| RadioError::InvalidAddress(s.to_string()))?;
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| RadioError::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(RadioError::InvalidAddress(s.to_string()));
        }
        Ok(HwAddr(octets))
    }
}
