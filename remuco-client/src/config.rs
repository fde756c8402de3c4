//! Terminal client configuration.

use std::path::Path;
use std::time::Duration;

use remuco_core::{ClientInfo, ConnectionConfig, DEFAULT_PORT, Endpoint};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the terminal client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to connect to.
    pub server: ServerConfig,
    /// Timeouts.
    pub connection: ConnectionSettings,
    /// What the client announces to the server.
    pub client: ClientSettings,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Server address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Connection timeouts in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub connect_timeout_ms: u64,
    pub handshake_timeout_ms: u64,
    /// 0 disables the request timeout.
    pub request_timeout_ms: u64,
}

/// Client info sent during the handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Cover image edge length in pixels, 0 for no images.
    pub image_size: i32,
    /// Entries per list page.
    pub page_size: i32,
    /// Device name shown by the server.
    pub device_name: String,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            handshake_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            image_size: 0,
            page_size: 50,
            device_name: env!("CARGO_PKG_NAME").into(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ClientConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn default_toml() -> std::io::Result<String> {
        toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.server.host.clone(), self.server.port)
    }

    /// Core connection settings derived from this file.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        let mut info = ClientInfo {
            image_size: self.client.image_size.max(0),
            page_size: self.client.page_size.max(1),
            ..ClientInfo::default()
        };
        info.device
            .insert("name".into(), self.client.device_name.clone());

        let request_timeout = match self.connection.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        ConnectionConfig::default()
            .with_connect_timeout(Duration::from_millis(self.connection.connect_timeout_ms))
            .with_handshake_timeout(Duration::from_millis(self.connection.handshake_timeout_ms))
            .with_request_timeout(request_timeout)
            .with_client_info(info)
    }
}

// ── Tests ────────────────────────────────────────────────────────
