//! Bounded-retry acknowledged delivery.
//!
//! Turns the link's fire-and-forget submit plus its uncorrelated completion
//! reports into a definite delivered-or-failed answer. Reports are matched
//! to submissions purely by arrival order, so at most one submission may be
//! outstanding anywhere in the system: the coordinator takes `&mut self`
//! and drains stale reports before every attempt.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use peerwave_transport::{HwAddr, RadioAdapter, SendReport};

/// Final outcome of an acknowledged send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The link confirmed delivery within the attempt budget.
    Delivered,
    /// Every attempt was rejected, reported failed, or timed out.
    Failed,
}

/// Retry policy for acknowledged sends.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of transmission attempts.
    pub max_retries: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// How long to wait for a completion report per attempt.
    pub ack_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_millis(100),
            ack_timeout: Duration::from_millis(1_000),
        }
    }
}

/// Serializes acknowledged sends over one radio adapter.
///
/// Owns the report channel exclusively; `send` takes `&mut self`, so the
/// borrow checker enforces the one-outstanding-submission rule.
pub struct SendCoordinator {
    adapter: Arc<dyn RadioAdapter>,
    reports: mpsc::Receiver<SendReport>,
    policy: RetryPolicy,
}

impl SendCoordinator {
    pub fn new(
        adapter: Arc<dyn RadioAdapter>,
        reports: mpsc::Receiver<SendReport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            adapter,
            reports,
            policy,
        }
    }

    /// Send `payload` to `destination` and wait for the link's verdict.
    ///
    /// Blocks for at most
    /// `max_retries * (ack_timeout + retry_delay)`; every failure mode below
    /// retry exhaustion is absorbed here.
    pub async fn send(&mut self, destination: HwAddr, payload: Bytes) -> SendOutcome {
        for attempt in 1..=self.policy.max_retries {
            if attempt > 1 {
                sleep(self.policy.retry_delay).await;
            }

            // A report that arrives after its attempt concluded belongs to
            // nobody: drop anything already queued before submitting.
            self.drain_stale_reports();

            if let Err(e) = self.adapter.submit(destination, payload.clone()).await {
                tracing::warn!(%destination, attempt, "submit rejected: {e}");
                continue;
            }

            match timeout(self.policy.ack_timeout, self.reports.recv()).await {
                Ok(Some(report)) if report.success => {
                    tracing::debug!(%destination, attempt, "delivered");
                    return SendOutcome::Delivered;
                }
                Ok(Some(report)) => {
                    tracing::debug!(destination = %report.destination, attempt, "delivery failed");
                }
                Ok(None) => {
                    tracing::warn!(%destination, "report channel closed, giving up");
                    return SendOutcome::Failed;
                }
                Err(_) => {
                    tracing::debug!(%destination, attempt, "no completion report in time");
                }
            }
        }

        tracing::warn!(%destination, attempts = self.policy.max_retries, "delivery exhausted");
        SendOutcome::Failed
    }

    fn drain_stale_reports(&mut self) {
        while let Ok(report) = self.reports.try_recv() {
            tracing::debug!(destination = %report.destination, "dropping stale completion report");
        }
    }
}
