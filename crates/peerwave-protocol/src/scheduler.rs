//! Per-tick send planning.
//!
//! Decides which lanes fire on a tick: a unicast heartbeat whenever a peer
//! is active, and a broadcast discovery probe whenever no peer is active or
//! the probe cadence elapsed. Probing continues on cadence even with a
//! healthy peer — the probe doubles as a periodic rediscovery beacon.

use peerwave_transport::HwAddr;

/// What to transmit on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    /// Unicast heartbeat target, if a peer is active.
    pub heartbeat: Option<HwAddr>,
    /// Whether to send a broadcast discovery probe.
    pub probe: bool,
}

/// Schedules broadcast discovery probes against the configured cadence.
#[derive(Debug)]
pub struct DiscoveryScheduler {
    probe_interval_ms: u64,
    last_probe_ms: Option<u64>,
}

impl DiscoveryScheduler {
    pub fn new(probe_interval_ms: u64) -> Self {
        Self {
            probe_interval_ms,
            last_probe_ms: None,
        }
    }

    /// Plan the sends for a tick at `now_ms`.
    pub fn plan_at(&self, now_ms: u64, active_peer: Option<HwAddr>) -> TickPlan {
        let probe_due = match self.last_probe_ms {
            Some(last) => now_ms.saturating_sub(last) > self.probe_interval_ms,
            None => true,
        };
        TickPlan {
            heartbeat: active_peer,
            probe: active_peer.is_none() || probe_due,
        }
    }

    /// Record a successfully sent probe at `now_ms`.
    pub fn record_probe_at(&mut self, now_ms: u64) {
        self.last_probe_ms = Some(now_ms);
    }
}
