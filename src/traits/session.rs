//! Session storage trait
//!
//! This trait abstracts session persistence, allowing users to swap between
//! the key-value backed store or custom implementations.

use crate::error::Result;
use crate::session::{SessionData, SessionId};
use async_trait::async_trait;

/// Session repository
///
/// Maps session identifiers to session data. Missing identifiers are never
/// errors; only backing store failures are.
#[async_trait]
#[allow(async_fn_in_trait)] // async_trait macro handles Send/Sync bounds
pub trait SessionStore: Send + Sync {
    /// Look up the data stored for `id`
    ///
    /// Returns `Ok(None)` if there is no (readable) entry.
    async fn find(&self, id: &SessionId) -> Result<Option<SessionData>>;

    /// Save `data`, returning the identifier it was stored under
    ///
    /// `Some(id)` is returned unchanged. `None` stores the data under a
    /// freshly generated identifier.
    async fn save(&self, id: Option<&SessionId>, data: &SessionData) -> Result<SessionId>;

    /// Delete a session
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Check if the session store is healthy
    fn is_healthy(&self) -> bool;

    /// Load session data, degrading to an empty session
    ///
    /// An absent identifier or a missing entry yields a fresh empty map.
    async fn load(&self, id: Option<&SessionId>) -> Result<SessionData> {
        match id {
            Some(id) => Ok(self.find(id).await?.unwrap_or_default()),
            None => Ok(SessionData::new()),
        }
    }

    /// Generate a new identifier
    fn generate_id(&self) -> SessionId {
        SessionId::generate()
    }
}
