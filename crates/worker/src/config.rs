use std::time::Duration;

use issuehub_events::dispatch::DEFAULT_LOCK_TTL;
use issuehub_events::stacking::DEFAULT_STACK_INTERVAL;

/// Default Redis list the API pushes tasks onto.
pub const DEFAULT_TASK_QUEUE_KEY: &str = "issuehub:tasks";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} must be a positive integer, got {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub redis_url: String,
    pub task_queue_key: String,
    /// Maximum tasks executed at once.
    pub concurrency: usize,
    pub stack_interval: Duration,
    pub lock_ttl: Duration,
    /// Web origin used in email links when none is cached for the issue.
    pub web_url: String,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                     | Default                  |
    /// |-----------------------------|--------------------------|
    /// | `DATABASE_URL`              | required                 |
    /// | `REDIS_URL`                 | `redis://127.0.0.1:6379` |
    /// | `TASK_QUEUE_KEY`            | `issuehub:tasks`         |
    /// | `WORKER_CONCURRENCY`        | `8`                      |
    /// | `EMAIL_STACK_INTERVAL_SECS` | `300`                    |
    /// | `EMAIL_LOCK_TTL_SECS`       | `300`                    |
    /// | `WEB_URL`                   | `http://localhost:3000`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let redis_url = get("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".into());
        let task_queue_key = get("TASK_QUEUE_KEY").unwrap_or_else(|| DEFAULT_TASK_QUEUE_KEY.into());

        let concurrency = positive(&get, "WORKER_CONCURRENCY", 8)? as usize;
        let stack_interval = Duration::from_secs(positive(
            &get,
            "EMAIL_STACK_INTERVAL_SECS",
            DEFAULT_STACK_INTERVAL.as_secs(),
        )?);
        let lock_ttl = Duration::from_secs(positive(
            &get,
            "EMAIL_LOCK_TTL_SECS",
            DEFAULT_LOCK_TTL.as_secs(),
        )?);

        let web_url = get("WEB_URL")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url,
            redis_url,
            task_queue_key,
            concurrency,
            stack_interval,
            lock_ttl,
            web_url,
        })
    }
}

fn positive(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match get(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid { name, value }),
        },
    }
}
