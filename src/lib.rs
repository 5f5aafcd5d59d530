//! kvsession - cookie-identified sessions over a key-value store
//!
//! kvsession resolves a session identifier from the request cookie, loads the
//! session data from a pluggable key-value backend, hands it to the handler
//! and then decides whether to persist, discard or re-key it and whether a
//! `Set-Cookie` header has to be sent.
//!
//! # Features
//!
//! - **Cookie codec**: session id extraction and `Set-Cookie` encoding
//! - **Repository**: namespaced JSON entries with expiry over any [`Backend`]
//! - **Coordinator**: commit, drop, renew and defer outcomes per request
//! - **Axum integration**: [`SessionLayer`] and the [`Session`] extractor
//! - **Testing**: Alba-style HTTP testing utilities with cookie helpers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use kvsession::{ConfigBuilder, Session, SessionLayer};
//!
//! async fn counter(session: Session) -> String {
//!     let count = session.get::<u64>("counter").ok().flatten().unwrap_or(0) + 1;
//!     let _ = session.insert("counter", count);
//!     count.to_string()
//! }
//!
//! #[tokio::main]
//! async fn main() -> kvsession::Result<()> {
//!     kvsession::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let app = Router::new()
//!         .route("/", get(counter))
//!         .layer(SessionLayer::new(config.build_manager()?));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000")
//!         .await
//!         .map_err(|e| kvsession::KvSessionError::internal(e.to_string()))?;
//!     axum::serve(listener, app)
//!         .await
//!         .map_err(|e| kvsession::KvSessionError::internal(e.to_string()))
//! }
//! ```

#![allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds properly

pub mod backend;
mod config;
mod error;
pub mod session;
pub mod testing;
pub mod traits;
mod utils;

// Re-exports for public API
pub use backend::{BackendConfig, BackendKind, InMemoryBackend, InMemoryBackendBuilder};
#[cfg(feature = "redis")]
pub use backend::RedisBackend;
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use error::{ErrorResponse, KvSessionError, Result};
pub use session::{
    CommitResult, CookieCodec, KvSessionStore, LoadedSession, SameSitePolicy, Session,
    SessionConfig, SessionConfigBuilder, SessionData, SessionId, SessionLayer, SessionManager,
    SessionOutcome, SessionService, SessionTicket, StoreErrorPolicy,
};
pub use traits::backend::Backend;
pub use traits::session::SessionStore;
pub use utils::get_env_with_prefix;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "kvsession=debug")
/// - `KVSESSION_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("KVSESSION_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    install_subscriber(env_filter, json_logs);
}

/// Initialize tracing from a loaded [`Config`]
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);
    install_subscriber(env_filter, config.logging.json);
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    // try_init so a second call (e.g. from several tests) is a no-op
    if json {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init();
    }
}
