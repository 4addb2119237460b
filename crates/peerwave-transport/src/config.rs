/// Configuration for attaching a node to a [`RadioMedium`](crate::RadioMedium).
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use peerwave_transport::LinkConfig;
///
/// let config = LinkConfig::new().channel(6).recv_buffer(128);
/// ```
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Radio channel. Nodes only hear each other on the same channel.
    pub(crate) channel: u8,
    /// Maximum frame payload size in bytes.
    pub(crate) max_frame_len: usize,
    /// Maximum allow-list entries (the broadcast sentinel does not count).
    pub(crate) max_peers: usize,
    /// Channel buffer size for incoming frames and completion reports.
    pub(crate) recv_buffer: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self {
            channel: 1,
            max_frame_len: 64,
            max_peers: 20,
            recv_buffer: 64,
        }
    }

    /// Set the radio channel (default: 1).
    pub fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Set the maximum frame payload size (default: 64 bytes).
    pub fn max_frame_len(mut self, bytes: usize) -> Self {
        self.max_frame_len = bytes;
        self
    }

    /// Set the allow-list capacity (default: 20 entries).
    pub fn max_peers(mut self, peers: usize) -> Self {
        self.max_peers = peers;
        self
    }

    /// Set the notification channel buffer size (default: 64).
    pub fn recv_buffer(mut self, capacity: usize) -> Self {
        self.recv_buffer = capacity;
        self
    }
}
