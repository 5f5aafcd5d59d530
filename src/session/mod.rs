//! Session management and storage.
//!
//! Provides the cookie codec, the key-value backed session store, the
//! per-request coordinator and its tower/axum integration.

mod config;
mod cookie;
mod data;
mod handle;
mod id;
mod layer;
mod manager;
mod store;

pub use config::{
    MAX_EXPIRE_AFTER_SECONDS, SameSitePolicy, SessionConfig, SessionConfigBuilder, StoreErrorPolicy,
};
pub use self::cookie::CookieCodec;
pub use data::SessionData;
pub use handle::Session;
pub use id::{SESSION_ID_BYTES, SessionId};
pub use layer::{SessionLayer, SessionService};
pub use manager::{CommitResult, LoadedSession, SessionManager, SessionOutcome, SessionTicket};
pub use store::KvSessionStore;
