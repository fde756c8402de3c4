//! Where a connection to a Remuco server stands, and why it ended.
//!
//! The driver task is the only writer of the phase. Front ends read it
//! through a `watch` channel and get the reason with the final event.

use std::fmt;
use std::time::{Duration, Instant};

use crate::error::RemucoError;

// ── ConnectionPhase ──────────────────────────────────────────────

/// Phase of one connection.
///
/// ```text
///  Disconnected ─► Connecting ─► Handshaking ─► Established ─► Disconnecting
///       ▲              │  open        │  hello,       │  BYE, EOF,      │
///       │              │  failed      │  PINFO/CINFO  │  error, close   │
///       └──────────────┴──────────────┴───────────────────────────────────┘
/// ```
///
/// A failed open or handshake drops straight back to `Disconnected`;
/// only an established session passes through `Disconnecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    #[default]
    Disconnected,

    /// The connector is opening the byte stream.
    Connecting,

    /// Stream open. Waiting for the `FF FF FF 0A` hello and `CONN_PINFO`.
    Handshaking,

    /// `CONN_CINFO` went out; pushes, controls and requests flow.
    Established { since: Instant },

    /// Pending requests are being failed and the stream flushed.
    Disconnecting,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ConnectionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Handshaking => "Handshaking",
            Self::Established { .. } => "Established",
            Self::Disconnecting => "Disconnecting",
        }
    }

    pub fn is_established(&self) -> bool {
        matches!(self, Self::Established { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Session uptime; `None` unless established.
    pub fn established_for(&self) -> Option<Duration> {
        match self {
            Self::Established { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    /// Moves to `next` if `allowed` holds for the current phase.
    fn advance(
        &mut self,
        action: &'static str,
        allowed: bool,
        next: ConnectionPhase,
    ) -> Result<(), RemucoError> {
        if !allowed {
            return Err(RemucoError::InvalidTransition {
                action,
                phase: self.name(),
            });
        }
        *self = next;
        Ok(())
    }

    // ── Transitions ──────────────────────────────────────────────

    pub fn begin_connect(&mut self) -> Result<(), RemucoError> {
        let ok = self.is_disconnected();
        self.advance("connect", ok, Self::Connecting)
    }

    /// The stream is open; the server hello is next.
    pub fn begin_handshake(&mut self) -> Result<(), RemucoError> {
        let ok = matches!(self, Self::Connecting);
        self.advance("handshake", ok, Self::Handshaking)
    }

    /// Player info arrived and client info was written.
    pub fn complete_handshake(&mut self) -> Result<(), RemucoError> {
        let ok = matches!(self, Self::Handshaking);
        let now = Instant::now();
        self.advance("complete handshake", ok, Self::Established { since: now })
    }

    pub fn begin_disconnect(&mut self) -> Result<(), RemucoError> {
        let ok = self.is_established();
        self.advance("begin disconnect", ok, Self::Disconnecting)
    }

    /// Ends teardown, or abandons an open or handshake that never got
    /// to `Established`.
    pub fn finish_disconnect(&mut self) -> Result<(), RemucoError> {
        let ok = matches!(
            self,
            Self::Disconnecting | Self::Connecting | Self::Handshaking
        );
        self.advance("finish disconnect", ok, Self::Disconnected)
    }

    /// Last resort for teardown when `finish_disconnect` is rejected.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── DisconnectReason ─────────────────────────────────────────────

/// Carried by the single `Disconnected` event of a connection.
#[derive(Debug)]
pub enum DisconnectReason {
    /// `disconnect`, `shutdown_player`, or every handle dropped.
    Closed,
    /// `CONN_BYE` or end of stream from the server.
    ServerClosed,
    Error(RemucoError),
}

impl DisconnectReason {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn error(&self) -> Option<&RemucoError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::ServerClosed => f.write_str("server closed"),
            Self::Error(e) => write!(f, "{e}"),
        }
    }
}

impl From<RemucoError> for DisconnectReason {
    fn from(e: RemucoError) -> Self {
        Self::Error(e)
    }
}
