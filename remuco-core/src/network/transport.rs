//! Transport boundary: how the byte stream to a server is opened.

use std::fmt;
use std::io;
use std::str::FromStr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::RemucoError;

/// Default TCP port of a Remuco server.
pub const DEFAULT_PORT: u16 = 34271;

/// Opens the byte stream a connection runs on.
///
/// The connection driver calls `connect` once, inside its connect
/// timeout, and owns the returned stream exclusively.
#[async_trait]
pub trait Connector: Send + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn connect(self) -> io::Result<Self::Stream>;

    /// Human readable peer description for logs.
    fn peer(&self) -> String;
}

// ── Endpoint ─────────────────────────────────────────────────────

/// A TCP server address, `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = RemucoError;

    /// Accepts `host`, `host:port`, `[v6]` and `[v6]:port`. A bare IPv6
    /// address without brackets takes the default port.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || RemucoError::InvalidEndpoint(s.to_string());

        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
            match tail {
                "" => (host, None),
                _ => (host, Some(tail.strip_prefix(':').ok_or_else(invalid)?)),
            }
        } else {
            match s.rsplit_once(':') {
                Some((host, port)) if !host.contains(':') => (host, Some(port)),
                _ => (s, None),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }
        let port = match port {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => DEFAULT_PORT,
        };
        Ok(Self::new(host, port))
    }
}

#[async_trait]
impl Connector for Endpoint {
    type Stream = TcpStream;

    async fn connect(self) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn peer(&self) -> String {
        self.to_string()
    }
}

// ── StreamConnector ──────────────────────────────────────────────

/// Wraps a stream that is already open (Bluetooth socket, test pipe, ...).
#[derive(Debug)]
pub struct StreamConnector<S> {
    stream: S,
    label: String,
}

impl<S> StreamConnector<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            label: "stream".to_string(),
        }
    }

    pub fn with_label(stream: S, label: impl Into<String>) -> Self {
        Self {
            stream,
            label: label.into(),
        }
    }
}

#[async_trait]
impl<S> Connector for StreamConnector<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Stream = S;

    async fn connect(self) -> io::Result<S> {
        Ok(self.stream)
    }

    fn peer(&self) -> String {
        self.label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_and_port() {
        let ep: Endpoint = "media.local:4000".parse().unwrap();
        assert_eq!(ep.host(), "media.local");
        assert_eq!(ep.port(), 4000);
    }

    #[test]
    fn parse_default_port() {
        let ep: Endpoint = "192.168.1.10".parse().unwrap();
        assert_eq!(ep.port(), DEFAULT_PORT);
        assert_eq!(ep.to_string(), "192.168.1.10:34271");
    }

    #[test]
    fn parse_ipv6() {
        let ep: Endpoint = "[::1]:5000".parse().unwrap();
        assert_eq!(ep.host(), "::1");
        assert_eq!(ep.port(), 5000);
        assert_eq!(ep.to_string(), "[::1]:5000");

        let ep: Endpoint = "fe80::1".parse().unwrap();
        assert_eq!(ep.host(), "fe80::1");
        assert_eq!(ep.port(), DEFAULT_PORT);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Endpoint>().is_err());
        assert!("host:notaport".parse::<Endpoint>().is_err());
        assert!("host:70000".parse::<Endpoint>().is_err());
        assert!("[::1".parse::<Endpoint>().is_err());
        assert!(":80".parse::<Endpoint>().is_err());
    }

    #[tokio::test]
    async fn stream_connector_hands_back_stream() {
        let (a, _b) = tokio::io::duplex(64);
        let connector = StreamConnector::with_label(a, "pipe");
        assert_eq!(connector.peer(), "pipe");
        assert!(connector.connect().await.is_ok());
    }
}
