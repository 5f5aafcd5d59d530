//! Backing key-value stores for session data.
//!
//! Provides an in-memory backend by default, with optional Redis support
//! via the `redis` feature.

mod config;
mod in_memory;

#[cfg(feature = "redis")]
mod redis;

pub use config::{BackendConfig, BackendKind};
pub use in_memory::{InMemoryBackend, InMemoryBackendBuilder};

#[cfg(feature = "redis")]
pub use redis::RedisBackend;
