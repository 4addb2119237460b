use bytes::Bytes;
use tokio::sync::mpsc;

use crate::HwAddr;

/// A frame delivered to this node, unicast or broadcast.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    /// Sender's hardware address.
    pub source: HwAddr,
    /// Raw payload bytes.
    pub payload: Bytes,
}

/// Asynchronous completion report for a previously accepted submission.
///
/// Reports carry no frame identifier. The link emits exactly one report per
/// accepted submission, in submission order — correlation is temporal only,
/// which is why callers must keep at most one submission outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReport {
    /// Destination of the submission this report refers to.
    pub destination: HwAddr,
    /// Whether the link confirmed delivery.
    pub success: bool,
}

/// Receive-side notification channels handed out at attach time.
#[derive(Debug)]
pub struct LinkReceivers {
    /// Frames addressed to this node, including broadcast frames.
    pub frames: mpsc::Receiver<ReceivedFrame>,
    /// Completion reports, one per accepted submission, in order.
    pub reports: mpsc::Receiver<SendReport>,
}
