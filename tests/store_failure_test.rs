//! Behavior of the session layer when the backing store is unreachable

use async_trait::async_trait;
use axum::{Router, routing::get};
use kvsession::testing;
use kvsession::{
    Backend, KvSessionError, KvSessionStore, Session, SessionConfig, SessionId, SessionLayer,
    SessionManager, StoreErrorPolicy,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Backend that can be switched off at runtime
#[derive(Default)]
struct FlakyBackend {
    inner: kvsession::InMemoryBackend,
    down: AtomicBool,
}

impl FlakyBackend {
    fn check(&self) -> kvsession::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(KvSessionError::store("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn get_bytes(&self, key: &str) -> kvsession::Result<Option<Vec<u8>>> {
        self.check()?;
        self.inner.get_bytes(key).await
    }

    async fn put_bytes(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> kvsession::Result<()> {
        self.check()?;
        self.inner.put_bytes(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> kvsession::Result<()> {
        self.check()?;
        self.inner.delete(key).await
    }

    fn is_healthy(&self) -> bool {
        !self.down.load(Ordering::SeqCst)
    }
}

async fn counter(session: Session) -> kvsession::Result<String> {
    let counter = session.get::<i64>("counter")?.unwrap_or(0) + 1;
    session.insert("counter", counter)?;
    Ok(counter.to_string())
}

fn app(policy: StoreErrorPolicy) -> (Router, Arc<FlakyBackend>) {
    let config = SessionConfig {
        on_store_error: policy,
        ..Default::default()
    };
    let backend = Arc::new(FlakyBackend::default());
    let store = Arc::new(KvSessionStore::new(backend.clone(), &config));
    let router = Router::new()
        .route("/", get(counter))
        .layer(SessionLayer::new(SessionManager::new(store, config)));
    (router, backend)
}

#[tokio::test]
async fn test_fail_policy_returns_server_error() {
    let (router, backend) = app(StoreErrorPolicy::Fail);

    let established = testing::get(router.clone(), "/")
        .execute()
        .await
        .assert_ok()
        .cookie_pair("rack.session")
        .unwrap();

    backend.down.store(true, Ordering::SeqCst);

    // Lookup fails
    let response = testing::get(router.clone(), "/")
        .cookie(&established)
        .execute()
        .await
        .assert_server_error()
        .assert_no_set_cookie();
    let body: serde_json::Value = response.json().await;
    assert_eq!(body["error"], "Session store unavailable");

    // No cookie means no lookup, but the save still fails
    testing::get(router, "/")
        .execute()
        .await
        .assert_server_error()
        .assert_no_set_cookie();
}

#[tokio::test]
async fn test_ephemeral_policy_serves_without_persisting() {
    let (router, backend) = app(StoreErrorPolicy::Ephemeral);
    let established = testing::get(router.clone(), "/")
        .execute()
        .await
        .cookie_pair("rack.session")
        .unwrap();

    backend.down.store(true, Ordering::SeqCst);

    let response = testing::get(router.clone(), "/")
        .cookie(&established)
        .execute()
        .await
        .assert_ok()
        .assert_no_set_cookie();
    assert_eq!(response.body_string().await, "1");

    testing::get(router.clone(), "/")
        .execute()
        .await
        .assert_ok()
        .assert_no_set_cookie();

    // Once the store is back the original session is intact
    backend.down.store(false, Ordering::SeqCst);
    let response = testing::get(router, "/")
        .cookie(&established)
        .execute()
        .await
        .assert_ok();
    assert_eq!(response.body_string().await, "2");
}

#[tokio::test]
async fn test_undecodable_entry_is_a_fresh_session() {
    let config = SessionConfig::default();
    let backend = Arc::new(FlakyBackend::default());
    let id = SessionId::generate();
    backend
        .put_bytes(&format!("_sessions:{}", id), b"not json".to_vec(), None)
        .await
        .unwrap();

    let store = Arc::new(KvSessionStore::new(backend, &config));
    let router = Router::new()
        .route("/", get(counter))
        .layer(SessionLayer::new(SessionManager::new(store, config)));

    let response = testing::get(router, "/")
        .cookie(&format!("rack.session={}", id))
        .execute()
        .await
        .assert_ok()
        .assert_set_cookie("rack.session");
    assert_ne!(
        response.cookie_pair("rack.session").unwrap(),
        format!("rack.session={}", id)
    );
    assert_eq!(response.body_string().await, "1");
}
