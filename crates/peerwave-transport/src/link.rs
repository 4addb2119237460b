//! In-process radio medium.
//!
//! Connects any number of attached ports. Frames submitted on one port are
//! delivered to the others according to destination, channel, and the fault
//! knobs; every accepted submission produces exactly one completion report,
//! in submission order, unless reports are muted for fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::{
    HwAddr, LinkConfig, LinkReceivers, RadioAdapter, RadioError, ReceivedFrame, SendReport,
};

/// A shared in-process radio medium. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RadioMedium {
    inner: Arc<Mutex<MediumState>>,
}

#[derive(Debug, Default)]
struct MediumState {
    nodes: HashMap<HwAddr, NodeState>,
}

#[derive(Debug)]
struct NodeState {
    frames_tx: mpsc::Sender<ReceivedFrame>,
    reports_tx: mpsc::Sender<SendReport>,
    allowed: HashSet<HwAddr>,
    channel: u8,
    max_frame_len: usize,
    max_peers: usize,
    offline: bool,
    mute_reports: bool,
}

impl RadioMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a node to the medium.
    ///
    /// Returns the node's port plus its receive-side notification channels.
    /// Attaching an address twice, or attaching as the broadcast sentinel,
    /// is an init failure.
    pub fn attach(
        &self,
        address: HwAddr,
        config: LinkConfig,
    ) -> Result<(RadioPort, LinkReceivers), RadioError> {
        if address.is_broadcast() {
            return Err(RadioError::Init(anyhow::anyhow!(
                "cannot attach as the broadcast address"
            )));
        }

        let mut state = self.lock();
        if state.nodes.contains_key(&address) {
            return Err(RadioError::Init(anyhow::anyhow!(
                "{address} is already attached"
            )));
        }

        let (frames_tx, frames_rx) = mpsc::channel(config.recv_buffer);
        let (reports_tx, reports_rx) = mpsc::channel(config.recv_buffer);
        state.nodes.insert(
            address,
            NodeState {
                frames_tx,
                reports_tx,
                allowed: HashSet::new(),
                channel: config.channel,
                max_frame_len: config.max_frame_len,
                max_peers: config.max_peers,
                offline: false,
                mute_reports: false,
            },
        );
        tracing::debug!(%address, channel = config.channel, "attached to medium");

        Ok((
            RadioPort {
                address,
                medium: self.clone(),
            },
            LinkReceivers {
                frames: frames_rx,
                reports: reports_rx,
            },
        ))
    }

    /// Force a node dark: it receives nothing, its own transmissions fail,
    /// and unicast toward it reports failure.
    pub fn set_offline(&self, address: HwAddr, offline: bool) {
        if let Some(node) = self.lock().nodes.get_mut(&address) {
            node.offline = offline;
        }
    }

    /// Swallow completion reports for frames submitted by `address`,
    /// simulating ack loss.
    pub fn set_mute_reports(&self, address: HwAddr, mute: bool) {
        if let Some(node) = self.lock().nodes.get_mut(&address) {
            node.mute_reports = mute;
        }
    }

    fn lock(&self) -> MutexGuard<'_, MediumState> {
        self.inner.lock().expect("medium state poisoned")
    }
}

/// One node's attachment to a [`RadioMedium`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RadioPort {
    address: HwAddr,
    medium: RadioMedium,
}

#[async_trait]
impl RadioAdapter for RadioPort {
    fn own_address(&self) -> HwAddr {
        self.address
    }

    async fn add_allowed(&self, address: HwAddr) -> Result<(), RadioError> {
        let mut state = self.medium.lock();
        let node = state.nodes.get_mut(&self.address).ok_or(RadioError::Shutdown)?;
        if address.is_broadcast() || node.allowed.contains(&address) {
            return Err(RadioError::PeerExists { address });
        }
        if node.allowed.len() >= node.max_peers {
            return Err(RadioError::AllowListFull { max: node.max_peers });
        }
        node.allowed.insert(address);
        Ok(())
    }

    async fn remove_allowed(&self, address: HwAddr) -> Result<(), RadioError> {
        let mut state = self.medium.lock();
        let node = state.nodes.get_mut(&self.address).ok_or(RadioError::Shutdown)?;
        if !node.allowed.remove(&address) {
            return Err(RadioError::UnknownPeer { address });
        }
        Ok(())
    }

    async fn submit(&self, destination: HwAddr, payload: Bytes) -> Result<(), RadioError> {
        let state = self.medium.lock();
        let sender = state.nodes.get(&self.address).ok_or(RadioError::Shutdown)?;

        if payload.len() > sender.max_frame_len {
            return Err(RadioError::FrameTooLarge {
                size: payload.len(),
                max: sender.max_frame_len,
            });
        }
        if !destination.is_broadcast() && !sender.allowed.contains(&destination) {
            return Err(RadioError::UnknownPeer { address: destination });
        }

        // Reserve the report slot before delivering: rejected submissions
        // must not produce a report, accepted ones exactly one.
        let permit = if sender.mute_reports {
            None
        } else {
            match sender.reports_tx.try_reserve() {
                Ok(permit) => Some(permit),
                Err(_) => return Err(RadioError::QueueFull { destination }),
            }
        };

        let mut success = !sender.offline;
        if success {
            if destination.is_broadcast() {
                for (addr, node) in &state.nodes {
                    if *addr == self.address || node.offline || node.channel != sender.channel {
                        continue;
                    }
                    let frame = ReceivedFrame {
                        source: self.address,
                        payload: payload.clone(),
                    };
                    if node.frames_tx.try_send(frame).is_err() {
                        tracing::warn!(to = %addr, "receive buffer full, frame dropped");
                    }
                }
                // Link-layer broadcast has no ack: reported successful
                // regardless of who heard it.
            } else {
                success = match state.nodes.get(&destination) {
                    Some(node) if !node.offline && node.channel == sender.channel => {
                        let frame = ReceivedFrame {
                            source: self.address,
                            payload,
                        };
                        if node.frames_tx.try_send(frame).is_err() {
                            tracing::warn!(to = %destination, "receive buffer full, frame dropped");
                        }
                        true
                    }
                    _ => false,
                };
            }
        }

        if let Some(permit) = permit {
            permit.send(SendReport {
                destination,
                success,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> HwAddr {
        HwAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, n])
    }

    #[tokio::test]
    async fn attach_twice_is_init_error() {
        let medium = RadioMedium::new();
        medium.attach(addr(1), LinkConfig::new()).unwrap();
        let err = medium.attach(addr(1), LinkConfig::new()).unwrap_err();
        assert!(matches!(err, RadioError::Init(_)));
    }

    #[tokio::test]
    async fn attach_as_broadcast_is_init_error() {
        let medium = RadioMedium::new();
        let err = medium
            .attach(HwAddr::BROADCAST, LinkConfig::new())
            .unwrap_err();
        assert!(matches!(err, RadioError::Init(_)));
    }

    #[tokio::test]
    async fn broadcast_reaches_everyone_but_the_sender() {
        let medium = RadioMedium::new();
        let (a, mut a_rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        let (_b, mut b_rx) = medium.attach(addr(2), LinkConfig::new()).unwrap();
        let (_c, mut c_rx) = medium.attach(addr(3), LinkConfig::new()).unwrap();

        a.submit(HwAddr::BROADCAST, Bytes::from_static(b"probe"))
            .await
            .unwrap();

        let frame = b_rx.frames.recv().await.unwrap();
        assert_eq!(frame.source, addr(1));
        assert_eq!(&frame.payload[..], b"probe");
        assert_eq!(c_rx.frames.recv().await.unwrap().source, addr(1));
        assert!(a_rx.frames.try_recv().is_err());

        let report = a_rx.reports.recv().await.unwrap();
        assert_eq!(report.destination, HwAddr::BROADCAST);
        assert!(report.success);
    }

    #[tokio::test]
    async fn unicast_requires_allow_list_entry() {
        let medium = RadioMedium::new();
        let (a, mut a_rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        let (_b, mut b_rx) = medium.attach(addr(2), LinkConfig::new()).unwrap();

        let err = a
            .submit(addr(2), Bytes::from_static(b"hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, RadioError::UnknownPeer { .. }));

        a.add_allowed(addr(2)).await.unwrap();
        a.submit(addr(2), Bytes::from_static(b"hi")).await.unwrap();

        assert_eq!(b_rx.frames.recv().await.unwrap().source, addr(1));
        assert!(a_rx.reports.recv().await.unwrap().success);
    }

    #[tokio::test]
    async fn unicast_to_absent_node_reports_failure() {
        let medium = RadioMedium::new();
        let (a, mut a_rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        a.add_allowed(addr(9)).await.unwrap();

        a.submit(addr(9), Bytes::from_static(b"hi")).await.unwrap();

        let report = a_rx.reports.recv().await.unwrap();
        assert_eq!(report.destination, addr(9));
        assert!(!report.success);
    }

    #[tokio::test]
    async fn offline_node_is_dark() {
        let medium = RadioMedium::new();
        let (a, mut a_rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        let (_b, mut b_rx) = medium.attach(addr(2), LinkConfig::new()).unwrap();
        a.add_allowed(addr(2)).await.unwrap();
        medium.set_offline(addr(2), true);

        a.submit(addr(2), Bytes::from_static(b"hi")).await.unwrap();
        assert!(!a_rx.reports.recv().await.unwrap().success);
        assert!(b_rx.frames.try_recv().is_err());

        medium.set_offline(addr(2), false);
        a.submit(addr(2), Bytes::from_static(b"hi")).await.unwrap();
        assert!(a_rx.reports.recv().await.unwrap().success);
        assert!(b_rx.frames.try_recv().is_ok());
    }

    #[tokio::test]
    async fn different_channel_does_not_deliver() {
        let medium = RadioMedium::new();
        let (a, mut a_rx) = medium.attach(addr(1), LinkConfig::new().channel(1)).unwrap();
        let (_b, mut b_rx) = medium.attach(addr(2), LinkConfig::new().channel(6)).unwrap();
        a.add_allowed(addr(2)).await.unwrap();

        a.submit(addr(2), Bytes::from_static(b"hi")).await.unwrap();
        assert!(!a_rx.reports.recv().await.unwrap().success);
        assert!(b_rx.frames.try_recv().is_err());

        a.submit(HwAddr::BROADCAST, Bytes::from_static(b"probe"))
            .await
            .unwrap();
        assert!(b_rx.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn muted_reports_are_swallowed() {
        let medium = RadioMedium::new();
        let (a, mut a_rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        medium.set_mute_reports(addr(1), true);

        a.submit(HwAddr::BROADCAST, Bytes::from_static(b"probe"))
            .await
            .unwrap();
        assert!(a_rx.reports.try_recv().is_err());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let medium = RadioMedium::new();
        let (a, _rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        let payload = Bytes::from(vec![0u8; 65]);
        let err = a.submit(HwAddr::BROADCAST, payload).await.unwrap_err();
        assert!(matches!(err, RadioError::FrameTooLarge { size: 65, max: 64 }));
    }

    #[tokio::test]
    async fn allow_list_rejects_duplicates_and_bounds() {
        let medium = RadioMedium::new();
        let (a, _rx) = medium
            .attach(addr(1), LinkConfig::new().max_peers(2))
            .unwrap();

        a.add_allowed(addr(2)).await.unwrap();
        let err = a.add_allowed(addr(2)).await.unwrap_err();
        assert!(matches!(err, RadioError::PeerExists { .. }));

        a.add_allowed(addr(3)).await.unwrap();
        let err = a.add_allowed(addr(4)).await.unwrap_err();
        assert!(matches!(err, RadioError::AllowListFull { max: 2 }));

        a.remove_allowed(addr(2)).await.unwrap();
        let err = a.remove_allowed(addr(2)).await.unwrap_err();
        assert!(matches!(err, RadioError::UnknownPeer { .. }));
    }

    #[tokio::test]
    async fn broadcast_cannot_be_managed_on_the_allow_list() {
        let medium = RadioMedium::new();
        let (a, _rx) = medium.attach(addr(1), LinkConfig::new()).unwrap();
        assert!(a.add_allowed(HwAddr::BROADCAST).await.is_err());
    }

    #[tokio::test]
    async fn undrained_reports_backpressure_submissions() {
        let medium = RadioMedium::new();
        let (a, _rx) = medium
            .attach(addr(1), LinkConfig::new().recv_buffer(1))
            .unwrap();

        a.submit(HwAddr::BROADCAST, Bytes::from_static(b"one"))
            .await
            .unwrap();
        let err = a
            .submit(HwAddr::BROADCAST, Bytes::from_static(b"two"))
            .await
            .unwrap_err();
        assert!(matches!(err, RadioError::QueueFull { .. }));
    }
}
