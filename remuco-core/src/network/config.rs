//! Tunables of a single connection.

use std::time::Duration;

use crate::protocol::ClientInfo;

/// Shortest accepted request sweep period.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Upper bound for opening the transport.
    pub connect_timeout: Duration,
    /// Upper bound for receiving the server hello and player info.
    pub handshake_timeout: Duration,
    /// Deadline for request replies; `None` waits until teardown.
    pub request_timeout: Option<Duration>,
    /// How often outstanding requests are checked for expiry. Raised to
    /// [`MIN_SWEEP_INTERVAL`] when shorter.
    pub request_sweep_interval: Duration,
    /// Depth of the outbound command queue.
    pub command_capacity: usize,
    /// Sent to the server as `CONN_CINFO` after the player info arrived.
    pub client_info: ClientInfo,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(30)),
            request_sweep_interval: Duration::from_millis(500),
            command_capacity: 64,
            client_info: ClientInfo::default(),
        }
    }
}

impl ConnectionConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_request_sweep_interval(mut self, interval: Duration) -> Self {
        self.request_sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    pub fn with_client_info(mut self, info: ClientInfo) -> Self {
        self.client_info = info;
        self
    }
}
