//! # remuco-core
//!
//! Client side of the Remuco media player remote control protocol.
//!
//! This crate contains:
//! - **Message model**: `MessageId` (typed id bands), `Message`
//! - **Framing**: `Frame` and `RemucoCodec` for framed I/O via `tokio_util`
//! - **Payloads**: `Payload`, the tagged-element serial format and typed
//!   records (`PlayerInfo`, `PlayerState`, `Progress`, `Item`, `ItemList`)
//! - **Actions**: `Control`, `Activation`, `Request`
//! - **Network**: `Connection` driving connect, handshake, dispatch and teardown
//! - **State**: `ConnectionPhase`, `DisconnectReason`, `RequestTracker`
//! - **Error**: `RemucoError`, a typed `thiserror` hierarchy
//!
//! The crate logs through `tracing` and never installs a subscriber.

pub mod codec;
pub mod error;
pub mod message;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod state;
pub mod util;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::RemucoCodec;
pub use error::RemucoError;
pub use message::{ActId, Band, ConnId, CtrlId, Message, MessageId, ReqId, SyncId, is_request};
pub use network::{
    Connection, ConnectionConfig, ConnectionEvent, Connector, DEFAULT_PORT, Endpoint,
    EventReceiver, StreamConnector,
};
pub use packet::{Frame, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
pub use protocol::{
    Activation, ClientInfo, Control, Features, Item, ItemList, Payload, PayloadKind, Playback,
    PlayerInfo, PlayerState, Progress, Request, Tag,
};
pub use state::{ConnectionPhase, DisconnectReason, RequestTracker};
pub use util::format_time;
