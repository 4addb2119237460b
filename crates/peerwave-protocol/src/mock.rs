//! Scripted radio adapter for unit tests.
//!
//! Records every call and replays queued submit rejections, so tests can
//! drive the coordinator and driver without a medium.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use peerwave_transport::{HwAddr, RadioAdapter, RadioError};

/// Allow-list operation recorded by the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowOp {
    Add(HwAddr),
    Remove(HwAddr),
}

/// Fake radio that records calls and replays scripted submit verdicts.
#[derive(Clone)]
pub struct MockRadio {
    address: HwAddr,
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    submits: Vec<(HwAddr, Bytes)>,
    allow_ops: Vec<AllowOp>,
    rejections: VecDeque<RadioError>,
}

impl MockRadio {
    pub fn new(address: HwAddr) -> Self {
        Self {
            address,
            inner: Arc::new(Mutex::new(MockState::default())),
        }
    }

    pub fn submits(&self) -> Vec<(HwAddr, Bytes)> {
        self.inner.lock().unwrap().submits.clone()
    }

    pub fn submit_count(&self) -> usize {
        self.inner.lock().unwrap().submits.len()
    }

    pub fn allow_ops(&self) -> Vec<AllowOp> {
        self.inner.lock().unwrap().allow_ops.clone()
    }

    /// Queue a rejection for the next submit call. Rejected submissions are
    /// still recorded as attempts.
    pub fn push_rejection(&self, err: RadioError) {
        self.inner.lock().unwrap().rejections.push_back(err);
    }
}

#[async_trait]
impl RadioAdapter for MockRadio {
    fn own_address(&self) -> HwAddr {
        self.address
    }

    async fn add_allowed(&self, address: HwAddr) -> Result<(), RadioError> {
        self.inner.lock().unwrap().allow_ops.push(AllowOp::Add(address));
        Ok(())
    }

    async fn remove_allowed(&self, address: HwAddr) -> Result<(), RadioError> {
        self.inner
            .lock()
            .unwrap()
            .allow_ops
            .push(AllowOp::Remove(address));
        Ok(())
    }

    async fn submit(&self, destination: HwAddr, payload: Bytes) -> Result<(), RadioError> {
        let mut state = self.inner.lock().unwrap();
        state.submits.push((destination, payload));
        match state.rejections.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
