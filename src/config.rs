use crate::transfer::TransferTiming;
use crate::validation::{FileValidator, DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_FILE_SIZE};
use serde::Deserialize;
use std::env::vars;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(String),

    #[error("Invalid BIND_ADDR: {0}")]
    InvalidAddr(String),
}

/// Limits and pacing of the upload queue.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    /// Largest accepted file, inclusive
    pub max_file_size: u64,
    /// Accepted MIME type prefixes
    pub allowed_types: Vec<String>,
    /// Artificial store round trip (min, max)
    pub store_latency: (Duration, Duration),
    pub timing: TransferTiming,
    /// Generate previews for image files
    pub thumbnails: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
            store_latency: (Duration::from_millis(100), Duration::from_millis(300)),
            timing: TransferTiming::default(),
            thumbnails: true,
        }
    }
}

impl UploadConfig {
    /// No store latency and millisecond ticks.
    pub fn fast() -> Self {
        Self {
            store_latency: (Duration::ZERO, Duration::ZERO),
            timing: TransferTiming::fast(),
            ..Default::default()
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_allowed_types(mut self, prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allowed_types = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_store_latency(mut self, min: Duration, max: Duration) -> Self {
        self.store_latency = (min.min(max), max);
        self
    }

    pub fn with_timing(mut self, timing: TransferTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.thumbnails = enabled;
        self
    }

    pub fn validator(&self) -> FileValidator {
        FileValidator::new(self.max_file_size, self.allowed_types.clone())
    }
}

/// Settings of the HTTP server binary, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    bind_addr: IpAddr,
    port: u16,
    metrics_port: Option<u16>,
    seed_fixtures: bool,
    fast_mode: bool,
}

// Environment variables as read, before defaults are applied
#[derive(Deserialize)]
struct RawServerConfig {
    bind_addr: Option<String>,
    port: Option<u16>,
    metrics_port: Option<u16>,
    seed_fixtures: Option<bool>,
    fast_mode: Option<bool>,
}

impl ServerConfig {
    pub fn init() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment variables");
        let raw: RawServerConfig =
            serde_env::from_iter(vars()).map_err(|e| ConfigError::Env(e.to_string()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawServerConfig) -> Result<Self, ConfigError> {
        let RawServerConfig {
            bind_addr,
            port,
            metrics_port,
            seed_fixtures,
            fast_mode,
        } = raw;

        let bind_addr = match bind_addr {
            Some(addr) => addr
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidAddr(addr.clone()))?,
            None => {
                info!("BIND_ADDR not set, defaulting to 127.0.0.1");
                IpAddr::from([127, 0, 0, 1])
            }
        };

        let port = port.unwrap_or_else(|| {
            info!("PORT not set, defaulting to 3000");
            3000
        });

        Ok(Self {
            bind_addr,
            port,
            metrics_port,
            seed_fixtures: seed_fixtures.unwrap_or(true),
            fast_mode: fast_mode.unwrap_or(false),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Address of the standalone metrics listener, if enabled.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_port.map(|port| SocketAddr::new(self.bind_addr, port))
    }

    pub fn seed_fixtures(&self) -> bool {
        self.seed_fixtures
    }

    pub fn fast_mode(&self) -> bool {
        self.fast_mode
    }

    pub fn upload_config(&self) -> UploadConfig {
        if self.fast_mode {
            UploadConfig::fast()
        } else {
            UploadConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_env::from_iter;

    #[test]
    fn defaults_apply_when_unset() {
        let raw: RawServerConfig =
            from_iter(Vec::<(&str, &str)>::new()).expect("RawServerConfig should deserialize");
        let config = ServerConfig::from_raw(raw).expect("config should build");

        assert_eq!(config.socket_addr(), "127.0.0.1:3000".parse().unwrap());
        assert!(config.metrics_addr().is_none());
        assert!(config.seed_fixtures());
        assert!(!config.fast_mode());
        assert_eq!(config.upload_config(), UploadConfig::default());
    }

    #[test]
    fn values_are_read_from_env() {
        let raw: RawServerConfig = from_iter(vec![
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "8080"),
            ("METRICS_PORT", "9090"),
            ("SEED_FIXTURES", "false"),
            ("FAST_MODE", "true"),
        ])
        .expect("RawServerConfig should deserialize");
        let config = ServerConfig::from_raw(raw).expect("config should build");

        assert_eq!(config.socket_addr(), "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.metrics_addr(), Some("0.0.0.0:9090".parse().unwrap()));
        assert!(!config.seed_fixtures());
        assert_eq!(config.upload_config(), UploadConfig::fast());
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let raw: RawServerConfig =
            from_iter(vec![("BIND_ADDR", "not-an-ip")]).expect("RawServerConfig should deserialize");
        let err = ServerConfig::from_raw(raw).unwrap_err();
        assert!(err.to_string().contains("not-an-ip"));
    }

    #[test]
    fn upload_config_builders() {
        let config = UploadConfig::default()
            .with_max_file_size(10)
            .with_allowed_types(["text/"])
            .with_store_latency(Duration::from_millis(5), Duration::from_millis(1))
            .with_thumbnails(false);

        assert_eq!(config.max_file_size, 10);
        assert_eq!(config.allowed_types, vec!["text/".to_string()]);
        assert_eq!(config.store_latency, (Duration::from_millis(1), Duration::from_millis(1)));
        assert!(!config.thumbnails);
        assert_eq!(config.validator().max_file_size(), 10);
    }
}
