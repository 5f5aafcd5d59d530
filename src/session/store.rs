//! Session repository over a key-value backend

use super::config::SessionConfig;
use super::data::SessionData;
use super::id::SessionId;
use crate::error::{KvSessionError, Result};
use crate::traits::backend::Backend;
use crate::traits::session::SessionStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Session store backed by any [`Backend`]
///
/// Entries live under `"{namespace}:{id}"` as JSON. An entry that no longer
/// decodes is treated as missing, so a corrupted or foreign value degrades
/// to an empty session instead of failing every request that carries it.
#[derive(Clone)]
pub struct KvSessionStore {
    backend: Arc<dyn Backend>,
    namespace: String,
    ttl: Option<Duration>,
}

impl KvSessionStore {
    /// Create a store with the namespace and TTL from `config`
    pub fn new(backend: Arc<dyn Backend>, config: &SessionConfig) -> Self {
        Self {
            backend,
            namespace: config.namespace.clone(),
            ttl: config.expire_after(),
        }
    }

    fn backend_key(&self, id: &SessionId) -> String {
        format!("{}:{}", self.namespace, id)
    }
}

#[async_trait]
impl SessionStore for KvSessionStore {
    async fn find(&self, id: &SessionId) -> Result<Option<SessionData>> {
        let Some(bytes) = self.backend.get_bytes(&self.backend_key(id)).await? else {
            return Ok(None);
        };

        match serde_json::from_slice::<SessionData>(&bytes) {
            Ok(mut data) => {
                data.mark_clean();
                Ok(Some(data))
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %id.short(),
                    error = %e,
                    "Discarding undecodable session entry"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, id: Option<&SessionId>, data: &SessionData) -> Result<SessionId> {
        let id = match id {
            Some(id) => id.clone(),
            None => self.generate_id(),
        };

        let bytes = serde_json::to_vec(data)
            .map_err(|e| KvSessionError::serialization(format!("Failed to serialize session: {}", e)))?;
        self.backend
            .put_bytes(&self.backend_key(&id), bytes, self.ttl)
            .await?;

        Ok(id)
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.backend.delete(&self.backend_key(id)).await
    }

    fn is_healthy(&self) -> bool {
        self.backend.is_healthy()
    }
}
