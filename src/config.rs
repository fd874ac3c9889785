//! Configuration management with validation and defaults
//!
//! Loaded from an optional TOML file, then overridden by `SLOTVAULT_*`
//! environment variables, then by command-line flags in the binaries.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Top-level service configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotVaultConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            allowed_origins: vec![],
        }
    }
}

/// Storage configuration with RocksDB tuning and transaction limits
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
    /// fsync the WAL on every commit
    pub sync_writes: bool,
    /// Longest wait for a row lock before the transaction gives up
    pub lock_timeout_ms: u64,
    /// Deadline for one unit of work; 0 disables it
    pub transaction_timeout_ms: u64,
    pub write_buffer_size_mb: usize,
    pub compression_type: CompressionType,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/slotvault_data".to_string(),
            sync_writes: true,
            lock_timeout_ms: 5_000,
            transaction_timeout_ms: 10_000,
            write_buffer_size_mb: 64,
            compression_type: CompressionType::Lz4,
        }
    }
}

/// Password hashing and token signing
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: 24 * 60 * 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 200,
            burst: 400,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `slotvault=debug,tower_http=info`
    pub level: String,
    pub format: LogFormat,
    /// Include file and line in each event
    pub with_source: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            with_source: false,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("missing required configuration: {0}")]
    MissingRequired(String),
}

impl SlotVaultConfig {
    /// Read a TOML file; absent sections take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Configuration for tests: fast hashing, short timeouts, fixed secret.
    pub fn testing<P: AsRef<Path>>(data_directory: P) -> Self {
        Self {
            storage: StorageConfig {
                data_directory: data_directory.as_ref().display().to_string(),
                sync_writes: false,
                lock_timeout_ms: 2_000,
                transaction_timeout_ms: 5_000,
                write_buffer_size_mb: 8,
                compression_type: CompressionType::None,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                bcrypt_cost: 4,
                ..Default::default()
            },
            rate_limit: RateLimitConfig {
                enabled: false,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: "warn".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Production defaults: JSON logs, durable writes, strict timeouts
    pub fn production() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                ..Default::default()
            },
            storage: StorageConfig {
                write_buffer_size_mb: 128,
                ..Default::default()
            },
            logging: LoggingConfig {
                format: LogFormat::Json,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Apply `SLOTVAULT_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SLOTVAULT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SLOTVAULT_PORT") {
            self.server.port = parse_var("SLOTVAULT_PORT", &port)?;
        }
        if let Some(dir) = lookup("SLOTVAULT_DB_PATH") {
            self.storage.data_directory = dir;
        }
        if let Some(secret) = lookup("SLOTVAULT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(cost) = lookup("SLOTVAULT_BCRYPT_COST") {
            self.auth.bcrypt_cost = parse_var("SLOTVAULT_BCRYPT_COST", &cost)?;
        }
        if let Some(level) = lookup("SLOTVAULT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("SLOTVAULT_LOG_FORMAT") {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(ConfigError::InvalidValue(format!(
                        "SLOTVAULT_LOG_FORMAT must be text or json, got {:?}",
                        other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue("server.port must be > 0".to_string()));
        }

        if self.storage.data_directory.trim().is_empty() {
            return Err(ConfigError::MissingRequired("storage.data_directory".to_string()));
        }

        if self.storage.lock_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }

        if self.storage.transaction_timeout_ms != 0
            && self.storage.transaction_timeout_ms < self.storage.lock_timeout_ms
        {
            return Err(ConfigError::InvalidValue(
                "storage.transaction_timeout_ms must not be shorter than storage.lock_timeout_ms"
                    .to_string(),
            ));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.jwt_secret".to_string()));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "auth.bcrypt_cost must be within 4..=31, got {}",
                self.auth.bcrypt_cost
            )));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.token_ttl_secs must be > 0".to_string(),
            ));
        }

        if self.rate_limit.enabled && (self.rate_limit.requests_per_second == 0 || self.rate_limit.burst == 0) {
            return Err(ConfigError::InvalidValue(
                "rate_limit.requests_per_second and rate_limit.burst must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.lock_timeout_ms)
    }

    pub fn transaction_timeout(&self) -> Option<Duration> {
        match self.storage.transaction_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.token_ttl_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} has invalid value {:?}", name, value)))
}
