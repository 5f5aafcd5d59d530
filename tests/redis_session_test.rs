//! Session lifecycle against a live Redis server
//!
//! Run with `cargo test --features redis -- --ignored` and Redis listening on
//! `REDIS_URL` (default `redis://127.0.0.1/`).

#![cfg(feature = "redis")]

use axum::{Router, routing::get};
use kvsession::testing;
use kvsession::{
    BackendConfig, BackendKind, Config, ConfigBuilder, Session, SessionLayer,
};

async fn counter(session: Session) -> kvsession::Result<String> {
    let counter = session.get::<i64>("counter")?.unwrap_or(0) + 1;
    session.insert("counter", counter)?;
    Ok(counter.to_string())
}

async fn drop_session(session: Session) -> &'static str {
    session.drop_session();
    "dropped"
}

fn redis_config() -> Config {
    let backend = BackendConfig {
        kind: BackendKind::Redis,
        redis_url: Some(
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string()),
        ),
        ..Default::default()
    };
    ConfigBuilder::new().with_backend(backend).build().unwrap()
}

#[tokio::test]
#[ignore] // Requires Redis
async fn test_counter_round_trip_through_redis() {
    let manager = redis_config().build_manager().unwrap();
    assert!(manager.store().is_healthy());

    let app = Router::new()
        .route("/", get(counter))
        .route("/drop", get(drop_session))
        .layer(SessionLayer::new(manager));

    let first = testing::get(app.clone(), "/")
        .execute()
        .await
        .assert_ok()
        .assert_set_cookie("rack.session");
    let cookie = first.cookie_pair("rack.session").unwrap();
    assert_eq!(first.body_string().await, "1");

    let second = testing::get(app.clone(), "/")
        .cookie(&cookie)
        .execute()
        .await
        .assert_no_set_cookie();
    assert_eq!(second.body_string().await, "2");

    testing::get(app.clone(), "/drop")
        .cookie(&cookie)
        .execute()
        .await
        .assert_no_set_cookie();

    let after_drop = testing::get(app, "/")
        .cookie(&cookie)
        .execute()
        .await
        .assert_set_cookie("rack.session");
    assert_eq!(after_drop.body_string().await, "1");
}
