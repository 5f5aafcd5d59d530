use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use crate::error::{KvSessionError, Result};
use crate::traits::backend::Backend;
use crate::utils::get_env_with_prefix;

use super::InMemoryBackend;

/// Backing store type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory store (default, for dev/testing)
    #[default]
    Memory,
    /// Redis store (requires the redis feature)
    #[cfg(feature = "redis")]
    Redis,
}

/// Backing store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend type
    #[serde(default)]
    pub kind: BackendKind,

    /// Redis connection URL (only used for the Redis backend)
    #[serde(default)]
    pub redis_url: Option<String>,

    /// TTL for entries written without an explicit one (in seconds)
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    /// Maximum number of entries for the in-memory backend
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            redis_url: None,
            default_ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

impl BackendConfig {
    /// Load backend configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(kind) = get_env_with_prefix("BACKEND") {
            config.kind = match kind.to_lowercase().as_str() {
                "redis" => {
                    #[cfg(feature = "redis")]
                    {
                        BackendKind::Redis
                    }
                    #[cfg(not(feature = "redis"))]
                    {
                        tracing::warn!("Redis backend requested but redis feature not enabled, using in-memory");
                        BackendKind::Memory
                    }
                }
                _ => BackendKind::Memory,
            };
        }

        if let Some(url) = get_env_with_prefix("REDIS_URL") {
            config.redis_url = Some(url);
        }

        if let Some(ttl) = get_env_with_prefix("BACKEND_DEFAULT_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse() {
                config.default_ttl_seconds = seconds;
            }
        }

        if let Some(max) = get_env_with_prefix("BACKEND_MAX_ENTRIES") {
            if let Ok(entries) = max.parse() {
                config.max_entries = entries;
            }
        }

        config
    }

    /// Get default TTL as Duration
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_ttl_seconds == 0 {
            return Err(KvSessionError::config("backend default TTL must be greater than zero"));
        }
        #[cfg(feature = "redis")]
        {
            if self.kind == BackendKind::Redis && self.redis_url.is_none() {
                return Err(KvSessionError::config("redis backend requires redis_url"));
            }
        }
        Ok(())
    }

    /// Build the configured backend
    pub fn build_backend(&self) -> Result<Arc<dyn Backend>> {
        self.validate()?;
        match self.kind {
            BackendKind::Memory => Ok(Arc::new(
                InMemoryBackend::builder()
                    .max_entries(self.max_entries)
                    .time_to_live(self.default_ttl())
                    .build(),
            )),
            #[cfg(feature = "redis")]
            BackendKind::Redis => {
                let url = self
                    .redis_url
                    .as_deref()
                    .ok_or_else(|| KvSessionError::config("redis backend requires redis_url"))?;
                Ok(Arc::new(super::RedisBackend::new(url, self.default_ttl())?))
            }
        }
    }
}

fn default_ttl_seconds() -> u64 {
    3600 * 24 // 24 hours
}

fn default_max_entries() -> u64 {
    100_000
}
