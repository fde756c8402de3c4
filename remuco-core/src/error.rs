//! Domain-specific error types for the Remuco protocol.
//!
//! All fallible operations return `Result<T, RemucoError>`.
//! No panics on invalid input: every error is typed and recoverable.

use std::time::Duration;
use thiserror::Error;

use crate::message::ReqId;

/// The canonical error type for the Remuco client core.
#[derive(Debug, Error)]
pub enum RemucoError {
    // ── Transport Errors ─────────────────────────────────────────
    /// Connecting, reading or writing the byte stream failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// A `host[:port]` string could not be parsed.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    // ── Handshake Errors ─────────────────────────────────────────
    /// The server's hello or player info was missing or malformed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The protocol version offered by the server is not supported.
    #[error("unsupported protocol version: {0:#04x}")]
    UnsupportedVersion(u8),

    // ── Framing Errors ───────────────────────────────────────────
    /// The byte stream no longer lines up with message boundaries.
    #[error("framing error: {0}")]
    Framing(&'static str),

    /// A frame announced a payload larger than the codec accepts.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Payload Errors ───────────────────────────────────────────
    /// A payload was truncated or malformed.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// A value does not have the shape the message id carries.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} value: {value}")]
    UnknownVariant { type_name: &'static str, value: i64 },

    // ── Protocol Errors ──────────────────────────────────────────
    /// Non-fatal protocol oddity (unknown id, stray reply).
    #[error("protocol anomaly: {0}")]
    ProtocolAnomaly(String),

    /// A message was handed to the wrong API (e.g. a request via `send`).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A request of the same class is already awaiting its reply.
    #[error("request {0} already in flight")]
    RequestInFlight(ReqId),

    /// A connection phase transition was attempted from the wrong phase.
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: &'static str,
    },

    // ── Lifecycle Errors ─────────────────────────────────────────
    /// The connection is torn down (or was torn down while waiting).
    #[error("connection closed")]
    ConnectionClosed,
}

impl RemucoError {
    /// Shorthand for a [`RemucoError::Decoding`] error.
    pub fn decoding(msg: impl Into<String>) -> Self {
        RemucoError::Decoding(msg.into())
    }

    /// Shorthand for a [`RemucoError::Encoding`] error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        RemucoError::Encoding(msg.into())
    }

    /// Returns `true` for errors that must tear the connection down.
    ///
    /// Anomalies and per-request failures are absorbed locally.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            RemucoError::ProtocolAnomaly(_)
                | RemucoError::InvalidMessage(_)
                | RemucoError::RequestInFlight(_)
                | RemucoError::UnknownVariant { .. }
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RemucoError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RemucoError::ConnectionClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for RemucoError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        RemucoError::ConnectionClosed
    }
}
