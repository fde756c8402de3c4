pub mod config;
pub mod connection;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionEvent, EventReceiver};
pub use transport::{Connector, DEFAULT_PORT, Endpoint, StreamConnector};
