//! Configuration management for the RAX FTP client
//!
//! Connection parameters and transfer tuning, loaded from an optional
//! `ftp-client.toml` with environment overrides. The library never loads
//! configuration by itself: callers build a session from a `ClientConfig`.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::transfer::file_ops::DEFAULT_BUFFER_SIZE;
use crate::transfer::{DataMode, InactivityPolicy};

/// Environment variable prefix, e.g. `FTP_CLIENT_HOST`.
pub const ENV_PREFIX: &str = "FTP_CLIENT";

/// Complete client configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClientConfig {
    // ═══ SERVER ═══
    /// Host name or IPv4 address of the FTP server
    pub host: String,

    /// Port of the FTP control connection
    pub control_port: u16,

    /// Credentials sent with USER/PASS
    pub username: String,
    pub password: String,

    // ═══ DATA CONNECTIONS ═══
    /// Mode the session starts in, and returns to after REIN
    pub default_mode: DataMode,

    /// Idle time after which a download or listing counts as finished
    pub data_inactivity_timeout_ms: u64,

    /// How long an active-mode listener waits for the server to connect
    pub accept_timeout_secs: u64,

    /// Buffer size for file transfers
    pub buffer_size: usize,

    /// Address used to discover the outward-facing interface in active mode
    pub discovery_probe: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            control_port: 21,
            username: "anonymous".to_string(),
            password: String::new(),
            default_mode: DataMode::Passive,
            data_inactivity_timeout_ms: 10_000,
            accept_timeout_secs: 30,
            buffer_size: DEFAULT_BUFFER_SIZE,
            discovery_probe: "8.8.8.8:65530".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from ftp-client.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("ftp-client").required(false))
            .add_source(File::with_name("config/ftp-client").required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Self::from_settings(settings)
    }

    /// Load configuration from TOML text, unset keys keep their defaults
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_settings(settings)
    }

    fn from_settings(settings: Config) -> Result<Self, ConfigError> {
        let config: ClientConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Message("host cannot be empty".into()));
        }

        if self.control_port == 0 {
            return Err(ConfigError::Message("Control port cannot be 0".into()));
        }

        if self.data_inactivity_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "data_inactivity_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.accept_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "accept_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::Message(
                "buffer_size must be greater than 0".into(),
            ));
        }

        self.discovery_probe_addr()?;
        Ok(())
    }

    /// Get host and control port as socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }

    pub fn inactivity_policy(&self) -> InactivityPolicy {
        InactivityPolicy::new(Duration::from_millis(self.data_inactivity_timeout_ms))
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_secs(self.accept_timeout_secs)
    }

    pub fn discovery_probe_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.discovery_probe.parse().map_err(|_| {
            ConfigError::Message(format!(
                "discovery_probe {:?} is not an IP:port address",
                self.discovery_probe
            ))
        })
    }
}
