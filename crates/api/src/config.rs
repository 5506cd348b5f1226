use axum::http::HeaderValue;
use cipherq_worker::config::{parse_var, ConfigError};
use cipherq_worker::WorkerConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `7000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining in-flight jobs at shutdown (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Per-topic buffer of the message bus (default: `1024`).
    pub bus_capacity: usize,
    /// Seconds between observer pings (default: `30`).
    pub heartbeat_interval_secs: u64,
    pub worker: WorkerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                  |
    /// |---------------------------|--------------------------|
    /// | `HOST`                    | `0.0.0.0`                |
    /// | `PORT`                    | `7000`                   |
    /// | `CORS_ORIGINS`            | `http://localhost:7000`  |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                     |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `10`                     |
    /// | `BUS_CAPACITY`            | `1024`                   |
    /// | `HEARTBEAT_INTERVAL_SECS` | `30`                     |
    ///
    /// Worker settings are read by [`WorkerConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cors_origins: Vec<String> = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:7000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            HeaderValue::from_str(origin)
                .map_err(|e| ConfigError::invalid("CORS_ORIGINS", origin.clone(), e.to_string()))?;
        }

        let heartbeat_interval_secs: u64 = parse_var(&lookup, "HEARTBEAT_INTERVAL_SECS", 30)?;
        if heartbeat_interval_secs == 0 {
            return Err(ConfigError::invalid("HEARTBEAT_INTERVAL_SECS", "0", "must be at least 1"));
        }

        Ok(Self {
            host: parse_var(&lookup, "HOST", "0.0.0.0".to_string())?,
            port: parse_var(&lookup, "PORT", 7000)?,
            cors_origins,
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse_var(&lookup, "SHUTDOWN_TIMEOUT_SECS", 10)?,
            bus_capacity: parse_var(&lookup, "BUS_CAPACITY", 1024)?,
            heartbeat_interval_secs,
            worker: WorkerConfig::from_lookup(&lookup)?,
        })
    }
}
