//! Backend trait for the key-value store behind the session repository
//!
//! This trait abstracts the backing store, allowing users to swap between
//! in-memory, Redis, or custom implementations.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store holding serialized session blobs
///
/// Every failure must be reported as [`KvSessionError::Store`](crate::KvSessionError::Store)
/// so callers can tell an unreachable store from a missing key.
#[async_trait]
#[allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds
pub trait Backend: Send + Sync {
    /// Get the bytes stored under `key`
    ///
    /// Returns `Ok(None)` if the key doesn't exist or has expired.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store bytes under `key`, replacing any previous value
    ///
    /// If `ttl` is `None`, the backend's default TTL applies.
    async fn put_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Delete `key`; deleting a missing key is not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if the backend is healthy
    fn is_healthy(&self) -> bool;
}
