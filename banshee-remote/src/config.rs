//! Remote client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use banshee_core::{ConnectionConfig, DEFAULT_CHECK_TIMEOUT, DEFAULT_PORT, Link, Server};
use banshee_core::network::DEFAULT_MAX_FAILURES;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the remote client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server to talk to.
    pub server: ServerConfig,
    /// Network settings.
    pub network: NetworkConfig,
    /// Dispatcher settings.
    pub connection: ConnectionSection,
    /// Local caches.
    pub storage: StorageConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Credential configured in the listener's preferences.
    pub password_id: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// "wifi" or "mobile"; mobile uses longer timeouts.
    pub link: Link,
    /// Reachability probe timeout in milliseconds.
    pub check_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSection {
    /// Consecutive failures before the connection is dropped.
    pub max_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Library databases, covers and the server list live here.
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (overridden by `RUST_LOG`).
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            password_id: 0,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            link: Link::Wifi,
            check_timeout_ms: DEFAULT_CHECK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("banshee-cache"),
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
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Default config as TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = Self::default_toml().map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            max_failures: self.connection.max_failures,
            link: self.network.link,
        }
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_millis(self.network.check_timeout_ms)
    }

    pub fn to_server(&self) -> Server {
        Server::new(
            self.server.host.clone(),
            self.server.port,
            self.server.password_id,
        )
    }

    pub fn servers_path(&self) -> PathBuf {
        self.storage.cache_dir.join("servers.json")
    }
}

// ── Tests ────────────────────────────────────────────────────────
