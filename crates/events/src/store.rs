//! Redis-backed key-value store and task queue.
//!
//! One [`redis::Client`] is opened at startup. Commands share a
//! [`ConnectionManager`]; the blocking queue consumer gets its own connection
//! so that `BRPOP` never delays lock traffic.

use std::sync::LazyLock;
use std::time::Duration;

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::AsyncCommands;

use crate::queue::{Task, TaskEnvelope, TaskQueue};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Task serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Minimal key-value interface used for delivery locks and cached settings.
pub trait KeyValueStore: Send + Sync {
    /// Set `key` only if it does not exist, expiring after `ttl`.
    ///
    /// Returns `true` when the key was set.
    fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Delete `key` only while it still holds `value`.
    ///
    /// Returns `true` when the key was deleted.
    fn release(
        &self,
        key: &str,
        value: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// RedisStore
// ---------------------------------------------------------------------------

/// Compare-and-delete; a key re-acquired by another holder is left alone.
static RELEASE_SCRIPT: LazyLock<redis::Script> = LazyLock::new(|| {
    redis::Script::new(
        r#"if redis.call("GET", KEYS[1]) == ARGV[1] then return redis.call("DEL", KEYS[1]) else return 0 end"#,
    )
});

#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(client: &redis::Client) -> Result<Self, StoreError> {
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for RedisStore {
    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let deleted: i64 = RELEASE_SCRIPT.key(key).arg(value).invoke_async(&mut conn).await?;
        Ok(deleted == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }
}

// ---------------------------------------------------------------------------
// Task queue
// ---------------------------------------------------------------------------

/// Producer side of the shared task lists.
#[derive(Clone)]
pub struct RedisTaskQueue {
    conn: ConnectionManager,
    /// Base key; see [`Task::queue_key`].
    key: String,
}

impl RedisTaskQueue {
    pub async fn connect(client: &redis::Client, key: impl Into<String>) -> Result<Self, StoreError> {
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            key: key.into(),
        })
    }
}

impl TaskQueue for RedisTaskQueue {
    async fn enqueue(&self, task: Task) -> Result<(), StoreError> {
        let envelope = TaskEnvelope::new(task);
        let body = serde_json::to_string(&envelope)?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(envelope.task.queue_key(&self.key), body).await?;
        tracing::debug!(task_id = %envelope.id, kind = envelope.task.kind(), "Task enqueued");
        Ok(())
    }
}

/// Consumer side of the shared task lists.
pub struct RedisTaskConsumer {
    conn: MultiplexedConnection,
    /// Lists popped from, highest priority first.
    keys: Vec<String>,
}

impl RedisTaskConsumer {
    pub async fn connect(client: &redis::Client, keys: Vec<String>) -> Result<Self, StoreError> {
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn, keys })
    }


    /// Block up to `timeout` for the next task.
    ///
    /// Entries that fail to decode are logged and dropped.
    pub async fn pop(&mut self, timeout: Duration) -> Result<Option<TaskEnvelope>, StoreError> {
        let reply: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.keys)
            .arg(timeout.as_secs().max(1))
            .query_async(&mut self.conn)
            .await?;

        let Some((_, body)) = reply else {
            return Ok(None);
        };

        match serde_json::from_str::<TaskEnvelope>(&body) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                tracing::error!(error = %e, body = %body, "Dropping undecodable task");
                Ok(None)
            }
        }
    }
}
