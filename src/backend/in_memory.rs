//! In-memory backend backed by moka
//!
//! Bounded by entry count, with per-entry TTL so session entries expire on
//! the same schedule as their cookies.

use crate::error::Result;
use crate::traits::backend::Backend;
use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;
use std::time::{Duration, Instant};

/// Default TTL for entries written without one (24 hours)
const DEFAULT_TTL: Duration = Duration::from_secs(86400);

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    /// Custom TTL for this entry, None means use default
    custom_ttl: Option<Duration>,
}

struct EntryExpiry {
    default_ttl: Duration,
}

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.custom_ttl.unwrap_or(self.default_ttl))
    }

    fn expire_after_read(
        &self,
        _key: &String,
        _value: &Entry,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        // Reads don't extend a session, only writes do
        duration_until_expiry
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.custom_ttl.unwrap_or(self.default_ttl))
    }
}

/// In-memory backend
///
/// Suitable for development, tests and single-instance deployments.
/// Sessions are lost on restart and not shared across instances.
///
/// # Example
///
/// ```rust,ignore
/// use kvsession::backend::InMemoryBackend;
///
/// let backend = InMemoryBackend::builder()
///     .max_entries(50_000)
///     .time_to_live(Duration::from_secs(3600))
///     .build();
/// ```
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: MokaCache<String, Entry>,
}

impl InMemoryBackend {
    /// Create a new in-memory backend with the specified maximum number of entries
    pub fn new(max_entries: u64) -> Self {
        Self::builder().max_entries(max_entries).build()
    }

    /// Create a backend builder for more configuration options
    pub fn builder() -> InMemoryBackendBuilder {
        InMemoryBackendBuilder::new()
    }

    /// Run pending maintenance tasks (eviction, expiration)
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Get the current number of entries
    ///
    /// The count is approximate until pending tasks have run.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

/// Builder for InMemoryBackend
pub struct InMemoryBackendBuilder {
    max_entries: u64,
    default_ttl: Duration,
}

impl InMemoryBackendBuilder {
    pub fn new() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Set maximum number of entries
    pub fn max_entries(mut self, max: u64) -> Self {
        self.max_entries = max;
        self
    }

    /// Set default time-to-live for entries
    pub fn time_to_live(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn build(self) -> InMemoryBackend {
        let expiry = EntryExpiry {
            default_ttl: self.default_ttl,
        };
        let cache = MokaCache::builder()
            .max_capacity(self.max_entries)
            .expire_after(expiry)
            .build();

        InMemoryBackend { inner: cache }
    }
}

impl Default for InMemoryBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key).await.map(|entry| entry.value))
    }

    async fn put_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            value,
            custom_ttl: ttl,
        };
        self.inner.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(10_000)
    }
}
