use crate::error::{KvSessionError, Result};
use crate::traits::backend::Backend;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Redis backend
///
/// Session blobs are written with `SETEX` so Redis expires them on its own.
/// All clones share one multiplexed connection. It is opened on first use
/// and opened again after an I/O failure.
#[derive(Clone)]
pub struct RedisBackend {
    client: redis::Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
    default_ttl: Duration,
}

impl RedisBackend {
    /// Create a new Redis backend from a connection URL
    pub fn new(url: &str, default_ttl: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| KvSessionError::config(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
            default_ttl,
        })
    }

    async fn get_connection(&self) -> Result<MultiplexedConnection> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| KvSessionError::store(format!("Failed to get Redis connection: {}", e)))?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    /// Map a command error, discarding the shared connection if it is broken
    async fn command_error(&self, command: &str, err: redis::RedisError) -> KvSessionError {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            tracing::warn!(error = %err, "Redis connection lost, reconnecting on next use");
            self.connection.lock().await.take();
        }
        KvSessionError::store(format!("Redis {} failed: {}", command, err))
    }

    #[cfg(test)]
    async fn has_connection(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.get_connection().await?;

        match redis::cmd("GET")
            .arg(key)
            .query_async::<Option<Vec<u8>>>(&mut conn)
            .await
        {
            Ok(value) => Ok(value),
            Err(e) => Err(self.command_error("GET", e).await),
        }
    }

    async fn put_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.get_connection().await?;

        // SETEX rejects zero, round sub-second TTLs up
        let ttl_secs = ttl.unwrap_or(self.default_ttl).as_secs().max(1);

        match redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.command_error("SETEX", e).await),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.get_connection().await?;

        match redis::cmd("DEL").arg(key).query_async::<()>(&mut conn).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.command_error("DEL", e).await),
        }
    }

    fn is_healthy(&self) -> bool {
        // Best effort: a blocking connection attempt
        self.client.get_connection().is_ok()
    }
}
