//! Host configuration types.
//!
//! [`HostConfig`] is the single source of truth for runtime settings.  It is
//! layered at startup, lowest precedence first:
//!
//! 1. [`HostConfig::default`]
//! 2. an optional TOML file ([`FileConfig`], every key optional)
//! 3. command-line flags and `EZCP_*` environment variables (in `main.rs`)
//!
//! Example file:
//!
//! ```toml
//! bind_address = "0.0.0.0"
//! port = 8080
//! broadcast_interval_ms = 350
//! heartbeat_interval_secs = 15
//! persist_debounce_ms = 250
//! data_dir = "ezcp-web"
//! log_level = "info"
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address: '{0}'")]
    InvalidBindAddress(String),

    /// The API server port (`port + 1`) does not fit in a `u16`.
    #[error("base port {0} leaves no room for the API port")]
    PortOverflow(u16),

    /// A timer interval was configured as zero.
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// All runtime configuration for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    /// Interface both servers bind to.  `0.0.0.0` accepts LAN connections.
    pub bind_address: IpAddr,
    /// Web/SSE server port; the JSON API server listens on `base_port + 1`.
    pub base_port: u16,
    /// How often the SSE hub checks the snapshot for a new `updatedAt`.
    pub broadcast_interval: Duration,
    /// How often SSE clients receive a `: ping` comment.
    pub heartbeat_interval: Duration,
    /// Quiet period before a changed snapshot is written to `data.json`.
    pub persist_debounce: Duration,
    /// Directory holding `data.json` and the exported page assets.
    pub data_dir: PathBuf,
    /// Fallback `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for HostConfig {
    /// | Field              | Default      |
    /// |--------------------|--------------|
    /// | bind_address       | `0.0.0.0`    |
    /// | base_port          | `8080`       |
    /// | broadcast_interval | 350 ms       |
    /// | heartbeat_interval | 15 s         |
    /// | persist_debounce   | 250 ms       |
    /// | data_dir           | `ezcp-web`   |
    /// | log_level          | `info`       |
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            base_port: 8080,
            broadcast_interval: Duration::from_millis(350),
            heartbeat_interval: Duration::from_secs(15),
            persist_debounce: Duration::from_millis(250),
            data_dir: PathBuf::from("ezcp-web"),
            log_level: "info".to_string(),
        }
    }
}

impl HostConfig {
    /// Address of the web/SSE server.
    pub fn web_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.base_port)
    }

    /// Address of the JSON API server (`base_port + 1`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PortOverflow`] when `base_port` is `65535`.
    pub fn api_addr(&self) -> Result<SocketAddr, ConfigError> {
        let port = self
            .base_port
            .checked_add(1)
            .ok_or(ConfigError::PortOverflow(self.base_port))?;
        Ok(SocketAddr::new(self.bind_address, port))
    }

    /// Overlays every key present in `file` onto `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` does not
    /// parse as an IP address.
    pub fn apply_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(bind) = file.bind_address {
            self.bind_address = bind
                .parse()
                .map_err(|_| ConfigError::InvalidBindAddress(bind))?;
        }
        if let Some(port) = file.port {
            self.base_port = port;
        }
        if let Some(ms) = file.broadcast_interval_ms {
            self.broadcast_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = file.heartbeat_interval_secs {
            self.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = file.persist_debounce_ms {
            self.persist_debounce = Duration::from_millis(ms);
        }
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
        Ok(())
    }

    /// Checks invariants the servers rely on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PortOverflow`] or [`ConfigError::ZeroInterval`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_addr()?;
        if self.broadcast_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("broadcast interval"));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("heartbeat interval"));
        }
        Ok(())
    }
}

/// On-disk configuration; absent keys keep the lower-precedence value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub broadcast_interval_ms: Option<u64>,
    pub heartbeat_interval_secs: Option<u64>,
    pub persist_debounce_ms: Option<u64>,
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
