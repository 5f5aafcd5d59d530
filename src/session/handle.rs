//! Session handle exposed to axum handlers

use super::data::SessionData;
use super::id::SessionId;
use super::manager::SessionOutcome;
use crate::error::{KvSessionError, Result};
use axum::{extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

#[derive(Debug, Default)]
struct SessionState {
    id: Option<SessionId>,
    data: SessionData,
    drop: bool,
    renew: bool,
    defer: bool,
}

/// Handle to the current request's session
///
/// Inserted into request extensions by [`SessionLayer`](super::SessionLayer)
/// and usable as an extractor. Clones share the same state; the handle is
/// meant to stay within one request.
///
/// # Example
///
/// ```rust,ignore
/// async fn counter(session: Session) -> kvsession::Result<String> {
///     let counter = session.get::<i64>("counter")?.unwrap_or(0) + 1;
///     session.insert("counter", counter)?;
///     Ok(counter.to_string())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

impl Session {
    pub(crate) fn new(id: Option<SessionId>, data: SessionData) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                id,
                data,
                ..Default::default()
            })),
        }
    }

    /// Identifier resolved at lookup, `None` for a new session
    ///
    /// Not updated by the commit: a renewed or newly created identifier only
    /// reaches the client through `Set-Cookie`.
    pub fn id(&self) -> Option<SessionId> {
        self.state.lock().id.clone()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.state.lock().data.get(key)
    }

    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<()> {
        self.state.lock().data.insert(key, value)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.state.lock().data.remove(key)
    }

    pub fn clear(&self) {
        self.state.lock().data.clear();
    }

    pub fn len(&self) -> usize {
        self.state.lock().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().data.is_empty()
    }

    /// Snapshot of the current data
    pub fn data(&self) -> SessionData {
        self.state.lock().data.clone()
    }

    /// Discard the session after this request; no cookie is sent
    pub fn drop_session(&self) {
        self.state.lock().drop = true;
    }

    /// Move the data to a new identifier after this request
    pub fn renew(&self) {
        self.state.lock().renew = true;
    }

    /// Persist the data but don't send a cookie for this request
    pub fn defer(&self) {
        self.state.lock().defer = true;
    }

    /// Clear the data and issue a new identifier
    ///
    /// A client presenting the old identifier afterwards gets an empty
    /// session.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.data.clear();
        state.data.mark_modified();
        state.renew = true;
    }

    /// Fold the flags into an outcome, taking the data out of the handle
    pub(crate) fn take_outcome(&self) -> SessionOutcome {
        let mut state = self.state.lock();
        let data = std::mem::take(&mut state.data);
        if state.drop {
            SessionOutcome::Drop
        } else if state.renew {
            SessionOutcome::Renew(data)
        } else if state.defer {
            SessionOutcome::Defer(data)
        } else {
            SessionOutcome::Commit(data)
        }
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = KvSessionError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = std::result::Result<Self, Self::Rejection>> + Send {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| KvSessionError::internal("Session not found in request extensions, is SessionLayer installed?"));
        std::future::ready(session)
    }
}
