pub mod connection;
mod requests;

pub use connection::{ConnectionPhase, DisconnectReason};
pub use requests::{ReplySender, RequestTracker, TrackedRequest};
