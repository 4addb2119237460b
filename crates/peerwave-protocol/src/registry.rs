//! Single-slot peer registry.
//!
//! Pure state machine: feed it received-frame sources and tick timestamps,
//! it reports transitions. The driver executes the resulting allow-list
//! changes; when a peer is replaced the old entry must be removed before the
//! new one is added, because the allow-list is bounded and rejects
//! duplicates.

use peerwave_transport::HwAddr;

/// The tracked peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PeerSlot {
    address: HwAddr,
    last_seen_ms: u64,
}

/// Transition reported by [`PeerRegistry::on_frame_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerChange {
    /// Source was the broadcast sentinel or this node itself — not a peer.
    Ignored,
    /// Contact from the current peer; only recency advanced.
    Refreshed,
    /// First peer adopted. Add it to the allow-list.
    Adopted { peer: HwAddr },
    /// A different address took the slot. Remove `old` from the allow-list,
    /// then add `new`.
    Replaced { old: HwAddr, new: HwAddr },
}

/// Tracks the single remote node this one exchanges frames with.
///
/// At most one peer is active at any time. The slot is adopted on the first
/// frame from a real address, refreshed on every further frame from it, and
/// vacated on silence or delivery exhaustion.
#[derive(Debug)]
pub struct PeerRegistry {
    local: HwAddr,
    slot: Option<PeerSlot>,
}

impl PeerRegistry {
    pub fn new(local: HwAddr) -> Self {
        Self { local, slot: None }
    }

    /// Record contact from `source` observed at `now_ms`.
    pub fn on_frame_at(&mut self, source: HwAddr, now_ms: u64) -> PeerChange {
        if source.is_broadcast() || source == self.local {
            return PeerChange::Ignored;
        }
        match self.slot {
            Some(ref mut slot) if slot.address == source => {
                slot.last_seen_ms = now_ms;
                PeerChange::Refreshed
            }
            Some(PeerSlot { address: old, .. }) => {
                self.slot = Some(PeerSlot {
                    address: source,
                    last_seen_ms: now_ms,
                });
                PeerChange::Replaced { old, new: source }
            }
            None => {
                self.slot = Some(PeerSlot {
                    address: source,
                    last_seen_ms: now_ms,
                });
                PeerChange::Adopted { peer: source }
            }
        }
    }

    /// Evict the peer once it has been silent for longer than `timeout_ms`.
    ///
    /// Returns the evicted address. Invoked once per driver tick.
    pub fn check_timeout_at(&mut self, now_ms: u64, timeout_ms: u64) -> Option<HwAddr> {
        let slot = self.slot?;
        if now_ms.saturating_sub(slot.last_seen_ms) > timeout_ms {
            self.slot = None;
            return Some(slot.address);
        }
        None
    }

    /// Evict `address` after the send coordinator exhausted its retries
    /// toward it. No-op unless it is the active peer.
    pub fn on_delivery_exhausted(&mut self, address: HwAddr) -> Option<HwAddr> {
        match self.slot {
            Some(slot) if slot.address == address => {
                self.slot = None;
                Some(address)
            }
            _ => None,
        }
    }

    /// The active peer, if any.
    pub fn current(&self) -> Option<HwAddr> {
        self.slot.map(|s| s.address)
    }

    /// When the active peer was last heard, in driver milliseconds.
    pub fn last_seen_ms(&self) -> Option<u64> {
        self.slot.map(|s| s.last_seen_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> HwAddr {
        HwAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, n])
    }

    const LOCAL: HwAddr = HwAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0xAA]);

    #[test]
    fn adopts_first_real_source() {
        let mut registry = PeerRegistry::new(LOCAL);
        assert_eq!(registry.current(), None);

        let change = registry.on_frame_at(addr(1), 100);
        assert_eq!(change, PeerChange::Adopted { peer: addr(1) });
        assert_eq!(registry.current(), Some(addr(1)));
        assert_eq!(registry.last_seen_ms(), Some(100));
    }

    #[test]
    fn broadcast_source_never_adopted() {
        let mut registry = PeerRegistry::new(LOCAL);
        assert_eq!(
            registry.on_frame_at(HwAddr::BROADCAST, 100),
            PeerChange::Ignored
        );
        assert_eq!(registry.current(), None);
    }

    #[test]
    fn own_address_never_adopted() {
        let mut registry = PeerRegistry::new(LOCAL);
        assert_eq!(registry.on_frame_at(LOCAL, 100), PeerChange::Ignored);
        assert_eq!(registry.current(), None);
    }

    #[test]
    fn repeated_contact_only_refreshes() {
        let mut registry = PeerRegistry::new(LOCAL);
        registry.on_frame_at(addr(1), 100);

        let change = registry.on_frame_at(addr(1), 250);
        assert_eq!(change, PeerChange::Refreshed);
        assert_eq!(registry.current(), Some(addr(1)));
        assert_eq!(registry.last_seen_ms(), Some(250));
    }

    #[test]
    fn different_source_replaces() {
        let mut registry = PeerRegistry::new(LOCAL);
        registry.on_frame_at(addr(1), 100);

        let change = registry.on_frame_at(addr(2), 200);
        assert_eq!(
            change,
            PeerChange::Replaced {
                old: addr(1),
                new: addr(2)
            }
        );
        assert_eq!(registry.current(), Some(addr(2)));
        assert_eq!(registry.last_seen_ms(), Some(200));
    }

    #[test]
    fn timeout_boundary_is_strict() {
        let mut registry = PeerRegistry::new(LOCAL);
        registry.on_frame_at(addr(1), 1_000);

        // Exactly at the window edge: still alive.
        assert_eq!(registry.check_timeout_at(11_000, 10_000), None);
        assert_eq!(registry.current(), Some(addr(1)));

        // One past the edge: evicted on this call.
        assert_eq!(registry.check_timeout_at(11_001, 10_000), Some(addr(1)));
        assert_eq!(registry.current(), None);
    }

    #[test]
    fn refresh_defers_timeout() {
        let mut registry = PeerRegistry::new(LOCAL);
        registry.on_frame_at(addr(1), 1_000);
        registry.on_frame_at(addr(1), 9_000);

        assert_eq!(registry.check_timeout_at(11_001, 10_000), None);
        assert_eq!(registry.check_timeout_at(19_001, 10_000), Some(addr(1)));
    }

    #[test]
    fn timeout_with_empty_slot_is_noop() {
        let mut registry = PeerRegistry::new(LOCAL);
        assert_eq!(registry.check_timeout_at(1_000_000, 10_000), None);
    }

    #[test]
    fn delivery_exhausted_evicts_only_the_active_peer() {
        let mut registry = PeerRegistry::new(LOCAL);
        registry.on_frame_at(addr(1), 100);

        assert_eq!(registry.on_delivery_exhausted(addr(2)), None);
        assert_eq!(registry.current(), Some(addr(1)));

        assert_eq!(registry.on_delivery_exhausted(addr(1)), Some(addr(1)));
        assert_eq!(registry.current(), None);

        assert_eq!(registry.on_delivery_exhausted(addr(1)), None);
    }

    #[test]
    fn readopts_after_eviction() {
        let mut registry = PeerRegistry::new(LOCAL);
        registry.on_frame_at(addr(1), 100);
        registry.check_timeout_at(20_000, 10_000);

        let change = registry.on_frame_at(addr(1), 21_000);
        assert_eq!(change, PeerChange::Adopted { peer: addr(1) });
    }
}
