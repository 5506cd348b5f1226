use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cipherq_core::topics::{DISPATCH_TOPIC, RESULT_TOPIC};
use cipherq_relay::RetryPolicy;

/// A configuration variable could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(var: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            var,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Parse `var` from `lookup`, falling back to `default` when unset or blank.
pub fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(var, raw.clone(), e.to_string())),
        _ => Ok(default),
    }
}

/// Worker pool and pipeline configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub dispatch_topic: String,
    pub result_topic: String,
    /// Maximum number of jobs in flight at once.
    pub pool_size: usize,
    /// Capacity of the hand-off queue between bus intake and the pool.
    pub queue_depth: usize,
    /// Root under which each job gets its own workspace directory.
    pub artifact_dir: PathBuf,
    pub transform_program: PathBuf,
    /// Launcher words placed before the program, e.g. `mpirun -np 2`.
    pub transform_launcher: Vec<String>,
    pub transform_timeout: Duration,
    pub record_store_url: String,
    pub http_timeout: Duration,
    pub transfer_retries: u32,
    pub transfer_retry_initial: Duration,
    pub dedup_ttl: Duration,
    pub dedup_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dispatch_topic: DISPATCH_TOPIC.into(),
            result_topic: RESULT_TOPIC.into(),
            pool_size: 4,
            queue_depth: 4,
            artifact_dir: PathBuf::from("./data"),
            transform_program: PathBuf::from("./hybrid"),
            transform_launcher: Vec::new(),
            transform_timeout: Duration::from_secs(600),
            record_store_url: "http://localhost:5050/database".into(),
            http_timeout: Duration::from_secs(30),
            transfer_retries: 3,
            transfer_retry_initial: Duration::from_millis(1000),
            dedup_ttl: Duration::from_secs(600),
            dedup_capacity: 4096,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                          |
    /// |-----------------------------|----------------------------------|
    /// | `DISPATCH_TOPIC`            | `aesTopic`                       |
    /// | `RESULT_TOPIC`              | `aesResultTopic`                 |
    /// | `WORKER_POOL_SIZE`          | `4`                              |
    /// | `WORKER_QUEUE_DEPTH`        | pool size                        |
    /// | `ARTIFACT_DIR`              | `./data`                         |
    /// | `TRANSFORM_PROGRAM`         | `./hybrid`                       |
    /// | `TRANSFORM_LAUNCHER`        | (none)                           |
    /// | `TRANSFORM_TIMEOUT_SECS`    | `600`                            |
    /// | `RECORD_STORE_URL`          | `http://localhost:5050/database` |
    /// | `HTTP_TIMEOUT_SECS`         | `30`                             |
    /// | `TRANSFER_RETRIES`          | `3`                              |
    /// | `TRANSFER_RETRY_INITIAL_MS` | `1000`                           |
    /// | `DEDUP_TTL_SECS`            | `600`                            |
    /// | `DEDUP_CAPACITY`            | `4096`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let pool_size: usize = parse_var(&lookup, "WORKER_POOL_SIZE", defaults.pool_size)?;
        if pool_size == 0 {
            return Err(ConfigError::invalid("WORKER_POOL_SIZE", "0", "must be at least 1"));
        }
        let queue_depth: usize = parse_var(&lookup, "WORKER_QUEUE_DEPTH", pool_size)?;
        if queue_depth == 0 {
            return Err(ConfigError::invalid("WORKER_QUEUE_DEPTH", "0", "must be at least 1"));
        }

        let transform_launcher = lookup("TRANSFORM_LAUNCHER")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Ok(Self {
            dispatch_topic: parse_var(&lookup, "DISPATCH_TOPIC", defaults.dispatch_topic)?,
            result_topic: parse_var(&lookup, "RESULT_TOPIC", defaults.result_topic)?,
            pool_size,
            queue_depth,
            artifact_dir: parse_var(&lookup, "ARTIFACT_DIR", defaults.artifact_dir)?,
            transform_program: parse_var(&lookup, "TRANSFORM_PROGRAM", defaults.transform_program)?,
            transform_launcher,
            transform_timeout: Duration::from_secs(parse_var(&lookup, "TRANSFORM_TIMEOUT_SECS", 600)?),
            record_store_url: parse_var(&lookup, "RECORD_STORE_URL", defaults.record_store_url)?,
            http_timeout: Duration::from_secs(parse_var(&lookup, "HTTP_TIMEOUT_SECS", 30)?),
            transfer_retries: parse_var(&lookup, "TRANSFER_RETRIES", defaults.transfer_retries)?,
            transfer_retry_initial: Duration::from_millis(parse_var(
                &lookup,
                "TRANSFER_RETRY_INITIAL_MS",
                1000,
            )?),
            dedup_ttl: Duration::from_secs(parse_var(&lookup, "DEDUP_TTL_SECS", 600)?),
            dedup_capacity: parse_var(&lookup, "DEDUP_CAPACITY", defaults.dedup_capacity)?,
        })
    }

    /// Retry policy for fetch and publish transfers.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.transfer_retries,
            initial_delay: self.transfer_retry_initial,
            ..Default::default()
        }
    }
}
