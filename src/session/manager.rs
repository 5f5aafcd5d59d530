//! Per-request session coordination
//!
//! [`SessionManager`] runs the session lifecycle for one request at a time:
//!
//! 1. **Lookup**: extract the identifier from the `Cookie` header and load
//!    its data. Unknown or malformed identifiers are discarded and the
//!    request starts with an empty session.
//! 2. **Handler**: the caller mutates the [`SessionData`] and decides on a
//!    [`SessionOutcome`].
//! 3. **Commit**: persist, drop, renew or defer, and decide whether the
//!    response carries a `Set-Cookie` header.
//!
//! Nothing is written before the commit step, so a request that is aborted
//! while the handler runs leaves both the store and the client untouched.

use super::config::{SessionConfig, StoreErrorPolicy};
use super::cookie::CookieCodec;
use super::data::SessionData;
use super::id::SessionId;
use crate::error::Result;
use crate::traits::session::SessionStore;
use axum::http::{HeaderMap, HeaderValue};
use std::future::Future;
use std::sync::Arc;

/// What the handler decided to do with the session
///
/// Precedence between conflicting requests is decided before a value of this
/// type exists: drop wins over renew, renew over defer, defer over commit.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Persist the data; send a cookie only if the identifier is new
    Commit(SessionData),
    /// Delete the session and send no cookie
    Drop,
    /// Persist the data under a new identifier and always send its cookie
    Renew(SessionData),
    /// Persist the data but send no cookie this time
    Defer(SessionData),
}

impl SessionOutcome {
    /// The data to be persisted, if any
    pub fn data(&self) -> Option<&SessionData> {
        match self {
            Self::Commit(data) | Self::Renew(data) | Self::Defer(data) => Some(data),
            Self::Drop => None,
        }
    }
}

/// What lookup resolved for the current request
///
/// Handed back to [`SessionManager::commit`]; it cannot be built by callers,
/// so the identifier a request commits under is always the one lookup
/// accepted.
#[derive(Debug)]
pub struct SessionTicket {
    id: Option<SessionId>,
    ephemeral: bool,
}

impl SessionTicket {
    /// Identifier accepted during lookup, `None` for a new session
    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Whether the store failed during lookup and the session won't be persisted
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// Result of the lookup step
#[derive(Debug)]
pub struct LoadedSession {
    ticket: SessionTicket,
    data: SessionData,
}

impl LoadedSession {
    fn fresh() -> Self {
        Self {
            ticket: SessionTicket {
                id: None,
                ephemeral: false,
            },
            data: SessionData::new(),
        }
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.ticket.id()
    }

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn into_parts(self) -> (SessionTicket, SessionData) {
        (self.ticket, self.data)
    }
}

/// Result of the commit step
#[derive(Debug, Default)]
pub struct CommitResult {
    /// Identifier the session is now stored under, `None` if nothing was stored
    pub id: Option<SessionId>,
    /// `Set-Cookie` value to add to the response, if any
    pub set_cookie: Option<HeaderValue>,
}

/// Request session coordinator
///
/// Cheap to share: wrap it in an `Arc` and use it from every request.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    codec: CookieCodec,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            codec: CookieCodec::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn codec(&self) -> &CookieCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Resolve the session for an inbound request
    ///
    /// Never fails because of the cookie itself. A store failure is returned
    /// as an error under [`StoreErrorPolicy::Fail`]; under
    /// [`StoreErrorPolicy::Ephemeral`] the request gets an empty session that
    /// will not be persisted.
    pub async fn begin(&self, headers: &HeaderMap) -> Result<LoadedSession> {
        let Some(id) = self.codec.extract(headers) else {
            return Ok(LoadedSession::fresh());
        };

        match self.store.find(&id).await {
            Ok(Some(data)) => {
                tracing::debug!(session_id = %id.short(), "Session loaded");
                Ok(LoadedSession {
                    ticket: SessionTicket {
                        id: Some(id),
                        ephemeral: false,
                    },
                    data,
                })
            }
            Ok(None) => {
                tracing::debug!(session_id = %id.short(), "Unknown session id, starting a new session");
                Ok(LoadedSession::fresh())
            }
            Err(e) => match self.config.on_store_error {
                StoreErrorPolicy::Fail => Err(e),
                StoreErrorPolicy::Ephemeral => {
                    tracing::warn!(error = %e, "Session store unavailable, using an ephemeral session");
                    let mut loaded = LoadedSession::fresh();
                    loaded.ticket.ephemeral = true;
                    Ok(loaded)
                }
            },
        }
    }

    /// Apply the handler's outcome
    pub async fn commit(&self, ticket: SessionTicket, outcome: SessionOutcome) -> Result<CommitResult> {
        if ticket.ephemeral {
            tracing::debug!("Skipping commit of ephemeral session");
            return Ok(CommitResult::default());
        }

        match self.apply(&ticket, outcome).await {
            Ok(result) => Ok(result),
            Err(e) => match self.config.on_store_error {
                StoreErrorPolicy::Fail => Err(e),
                StoreErrorPolicy::Ephemeral if e.is_store() => {
                    tracing::warn!(error = %e, "Session store unavailable, session not persisted");
                    Ok(CommitResult::default())
                }
                StoreErrorPolicy::Ephemeral => Err(e),
            },
        }
    }

    /// Run lookup, `handler` and commit in one go
    ///
    /// The handler receives the loaded data by value and returns the outcome
    /// alongside its own result.
    pub async fn process<F, Fut, R>(&self, headers: &HeaderMap, handler: F) -> Result<(R, CommitResult)>
    where
        F: FnOnce(SessionData) -> Fut,
        Fut: Future<Output = (SessionOutcome, R)>,
    {
        let (ticket, data) = self.begin(headers).await?.into_parts();
        let (outcome, response) = handler(data).await;
        let result = self.commit(ticket, outcome).await?;
        Ok((response, result))
    }

    async fn apply(&self, ticket: &SessionTicket, outcome: SessionOutcome) -> Result<CommitResult> {
        match outcome {
            SessionOutcome::Drop => {
                if let Some(id) = ticket.id() {
                    self.store.delete(id).await?;
                    tracing::debug!(session_id = %id.short(), "Session dropped");
                }
                Ok(CommitResult::default())
            }
            SessionOutcome::Renew(data) => {
                let new_id = self.store.generate_id();
                self.store.save(Some(&new_id), &data).await?;
                if let Some(old_id) = ticket.id() {
                    self.store.delete(old_id).await?;
                }
                tracing::debug!(
                    old_session_id = ticket.id().map(SessionId::short),
                    session_id = %new_id.short(),
                    "Session renewed"
                );
                let set_cookie = self.codec.encode(&new_id)?;
                Ok(CommitResult {
                    id: Some(new_id),
                    set_cookie: Some(set_cookie),
                })
            }
            SessionOutcome::Defer(data) => {
                if self.skip_unwritten(ticket, &data) {
                    return Ok(CommitResult::default());
                }
                let id = self.store.save(ticket.id(), &data).await?;
                tracing::debug!(session_id = %id.short(), "Session saved, cookie deferred");
                Ok(CommitResult {
                    id: Some(id),
                    set_cookie: None,
                })
            }
            SessionOutcome::Commit(data) => {
                if self.skip_unwritten(ticket, &data) {
                    return Ok(CommitResult::default());
                }
                let id = self.store.save(ticket.id(), &data).await?;

                // A sliding expiry needs the cookie refreshed on every request
                let send_cookie =
                    ticket.id() != Some(&id) || self.config.expire_after().is_some();
                let set_cookie = if send_cookie {
                    Some(self.codec.encode(&id)?)
                } else {
                    None
                };

                tracing::debug!(
                    session_id = %id.short(),
                    cookie = send_cookie,
                    "Session committed"
                );
                Ok(CommitResult {
                    id: Some(id),
                    set_cookie,
                })
            }
        }
    }

    /// Lazy sessions are only created once something is written to them
    fn skip_unwritten(&self, ticket: &SessionTicket, data: &SessionData) -> bool {
        self.config.lazy && ticket.id().is_none() && !data.is_modified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::error::KvSessionError;
    use crate::session::KvSessionStore;
    use crate::traits::backend::Backend;
    use async_trait::async_trait;
    use axum::http::header;
    use std::time::Duration;

    fn manager_with(config: SessionConfig) -> SessionManager {
        let backend = Arc::new(InMemoryBackend::new(1000));
        let store = Arc::new(KvSessionStore::new(backend, &config));
        SessionManager::new(store, config)
    }

    fn manager() -> SessionManager {
        manager_with(SessionConfig::default())
    }

    fn cookie_headers(manager: &SessionManager, id: &SessionId) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", manager.codec().key(), id)).unwrap(),
        );
        headers
    }

    /// Increment the counter and return its new value
    async fn increment(
        manager: &SessionManager,
        headers: &HeaderMap,
        wrap: fn(SessionData) -> SessionOutcome,
    ) -> (i64, CommitResult) {
        manager
            .process(headers, |mut data| async move {
                let counter = data.get::<i64>("counter").unwrap().unwrap_or(0) + 1;
                data.insert("counter", counter).unwrap();
                (wrap(data), counter)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_session_gets_cookie() {
        let manager = manager();
        let (counter, result) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;

        assert_eq!(counter, 1);
        let id = result.id.unwrap();
        let cookie = result.set_cookie.unwrap();
        assert!(cookie.to_str().unwrap().contains(&format!("rack.session={}", id)));
    }

    #[tokio::test]
    async fn test_known_session_accumulates_without_cookie() {
        let manager = manager();
        let (_, first) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        let id = first.id.unwrap();
        let headers = cookie_headers(&manager, &id);

        let (counter, second) = increment(&manager, &headers, SessionOutcome::Commit).await;
        assert_eq!(counter, 2);
        assert_eq!(second.id.as_ref(), Some(&id));
        assert!(second.set_cookie.is_none());

        let (counter, _) = increment(&manager, &headers, SessionOutcome::Commit).await;
        assert_eq!(counter, 3);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_reused() {
        let manager = manager();
        let unknown = SessionId::generate();
        let headers = cookie_headers(&manager, &unknown);

        let loaded = manager.begin(&headers).await.unwrap();
        assert!(loaded.id().is_none());
        assert!(loaded.data().is_empty());

        let (counter, result) = increment(&manager, &headers, SessionOutcome::Commit).await;
        assert_eq!(counter, 1);
        assert_ne!(result.id.as_ref(), Some(&unknown));
        assert!(!result.set_cookie.unwrap().to_str().unwrap().contains(unknown.as_str()));
    }

    #[tokio::test]
    async fn test_drop_deletes_and_sends_no_cookie() {
        let manager = manager();
        let (_, first) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        let id = first.id.unwrap();
        let headers = cookie_headers(&manager, &id);

        let (counter, dropped) = increment(&manager, &headers, |_| SessionOutcome::Drop).await;
        assert_eq!(counter, 2);
        assert!(dropped.id.is_none());
        assert!(dropped.set_cookie.is_none());
        assert!(manager.store().find(&id).await.unwrap().is_none());

        let (counter, after) = increment(&manager, &headers, SessionOutcome::Commit).await;
        assert_eq!(counter, 1);
        assert_ne!(after.id.as_ref(), Some(&id));
    }

    #[tokio::test]
    async fn test_drop_without_session_is_noop() {
        let manager = manager();
        let (_, result) = increment(&manager, &HeaderMap::new(), |_| SessionOutcome::Drop).await;
        assert!(result.id.is_none());
        assert!(result.set_cookie.is_none());
    }

    #[tokio::test]
    async fn test_renew_issues_new_id_and_keeps_data() {
        let manager = manager();
        let (_, first) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        let old_id = first.id.unwrap();

        let (counter, renewed) =
            increment(&manager, &cookie_headers(&manager, &old_id), SessionOutcome::Renew).await;
        assert_eq!(counter, 2);
        let new_id = renewed.id.unwrap();
        assert_ne!(new_id, old_id);
        assert!(renewed.set_cookie.unwrap().to_str().unwrap().contains(new_id.as_str()));

        assert!(manager.store().find(&old_id).await.unwrap().is_none());

        let (counter, next) =
            increment(&manager, &cookie_headers(&manager, &new_id), SessionOutcome::Commit).await;
        assert_eq!(counter, 3);
        assert!(next.set_cookie.is_none());
    }

    #[tokio::test]
    async fn test_defer_persists_without_cookie() {
        let manager = manager();
        let (_, first) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        let id = first.id.unwrap();
        let headers = cookie_headers(&manager, &id);

        let (counter, deferred) = increment(&manager, &headers, SessionOutcome::Defer).await;
        assert_eq!(counter, 2);
        assert_eq!(deferred.id.as_ref(), Some(&id));
        assert!(deferred.set_cookie.is_none());

        let (counter, _) = increment(&manager, &headers, SessionOutcome::Commit).await;
        assert_eq!(counter, 3);
    }

    #[tokio::test]
    async fn test_defer_on_new_session_assigns_id_silently() {
        let manager = manager();
        let (_, result) = increment(&manager, &HeaderMap::new(), SessionOutcome::Defer).await;

        let id = result.id.unwrap();
        assert!(result.set_cookie.is_none());
        assert!(manager.store().find(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expire_after_refreshes_cookie() {
        let manager = manager_with(SessionConfig {
            expire_after_seconds: Some(60),
            ..Default::default()
        });
        let (_, first) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        let id = first.id.unwrap();

        let (_, second) = increment(&manager, &cookie_headers(&manager, &id), SessionOutcome::Commit).await;
        let cookie = second.set_cookie.unwrap();
        let rendered = cookie.to_str().unwrap();
        assert!(rendered.contains(id.as_str()));
        assert!(rendered.contains("Max-Age=60"));
    }

    #[tokio::test]
    async fn test_lazy_skips_untouched_new_session() {
        let manager = manager_with(SessionConfig {
            lazy: true,
            ..Default::default()
        });

        let (_, result) = manager
            .process(&HeaderMap::new(), |data| async move { (SessionOutcome::Commit(data), ()) })
            .await
            .unwrap();
        assert!(result.id.is_none());
        assert!(result.set_cookie.is_none());

        let (counter, result) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        assert_eq!(counter, 1);
        assert!(result.set_cookie.is_some());
    }

    #[tokio::test]
    async fn test_lazy_still_saves_existing_session() {
        let manager = manager_with(SessionConfig {
            lazy: true,
            ..Default::default()
        });
        let (_, first) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        let id = first.id.unwrap();

        let (_, result) = manager
            .process(&cookie_headers(&manager, &id), |data| async move {
                (SessionOutcome::Commit(data), ())
            })
            .await
            .unwrap();
        assert_eq!(result.id, Some(id));
    }

    #[tokio::test]
    async fn test_abandoned_request_persists_nothing() {
        let manager = manager();
        let (ticket, mut data) = manager.begin(&HeaderMap::new()).await.unwrap().into_parts();
        data.insert("counter", 1).unwrap();
        drop(ticket);
        drop(data);

        // No commit happened, so the next request still starts empty
        let loaded = manager.begin(&HeaderMap::new()).await.unwrap();
        assert!(loaded.data().is_empty());
    }

    struct FailingBackend;

    #[async_trait]
    impl Backend for FailingBackend {
        async fn get_bytes(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(KvSessionError::store("connection refused"))
        }

        async fn put_bytes(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<()> {
            Err(KvSessionError::store("connection refused"))
        }

        async fn delete(&self, _key: &str) -> Result<()> {
            Err(KvSessionError::store("connection refused"))
        }

        fn is_healthy(&self) -> bool {
            false
        }
    }

    fn failing_manager(policy: StoreErrorPolicy) -> SessionManager {
        let config = SessionConfig {
            on_store_error: policy,
            ..Default::default()
        };
        let store = Arc::new(KvSessionStore::new(Arc::new(FailingBackend), &config));
        SessionManager::new(store, config)
    }

    #[tokio::test]
    async fn test_store_failure_is_reported() {
        let manager = failing_manager(StoreErrorPolicy::Fail);
        let headers = cookie_headers(&manager, &SessionId::generate());

        let err = manager.begin(&headers).await.unwrap_err();
        assert!(err.is_store());

        // No cookie means no lookup, but the commit still has to write
        let result = manager
            .process(&HeaderMap::new(), |data| async move { (SessionOutcome::Commit(data), ()) })
            .await;
        assert!(matches!(result, Err(KvSessionError::Store(_))));
    }

    #[tokio::test]
    async fn test_ephemeral_policy_degrades() {
        let manager = failing_manager(StoreErrorPolicy::Ephemeral);
        let headers = cookie_headers(&manager, &SessionId::generate());

        let loaded = manager.begin(&headers).await.unwrap();
        assert!(loaded.ticket.is_ephemeral());
        assert!(loaded.data().is_empty());

        let (counter, result) = increment(&manager, &headers, SessionOutcome::Commit).await;
        assert_eq!(counter, 1);
        assert!(result.id.is_none());
        assert!(result.set_cookie.is_none());

        let (_, result) = increment(&manager, &HeaderMap::new(), SessionOutcome::Commit).await;
        assert!(result.set_cookie.is_none());
    }
}
