//! Counter app backed by kvsession
//!
//! Run with:
//! ```bash
//! cargo run --example counter
//! # or against Redis
//! KVSESSION_BACKEND=redis KVSESSION_REDIS_URL=redis://127.0.0.1/ cargo run --example counter --features redis
//! ```
//!
//! Then:
//! ```bash
//! curl -c jar -b jar http://127.0.0.1:8000/
//! curl -c jar -b jar http://127.0.0.1:8000/renew
//! curl -c jar -b jar http://127.0.0.1:8000/logout
//! ```

use axum::{Json, Router, routing::get};
use kvsession::{ConfigBuilder, Session, SessionLayer};
use serde_json::{Value, json};

async fn count(session: Session) -> kvsession::Result<Json<Value>> {
    let counter = session.get::<u64>("counter")?.unwrap_or(0) + 1;
    session.insert("counter", counter)?;
    Ok(Json(json!({ "counter": counter })))
}

/// Bump the counter and move the session to a fresh id
async fn renew(session: Session) -> kvsession::Result<Json<Value>> {
    session.renew();
    count(session).await
}

async fn logout(session: Session) -> Json<Value> {
    session.drop_session();
    Json(json!({ "status": "logged out" }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    kvsession::init_tracing();

    let config = ConfigBuilder::new().from_env().build()?;
    let manager = config.build_manager()?;

    let app = Router::new()
        .route("/", get(count))
        .route("/renew", get(renew))
        .route("/logout", get(logout))
        .layer(SessionLayer::new(manager));

    let addr = config.server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Counter demo running on http://{}", addr);
    tracing::info!("  GET /        increment the counter");
    tracing::info!("  GET /renew   increment and issue a new session id");
    tracing::info!("  GET /logout  drop the session");

    axum::serve(listener, app).await?;
    Ok(())
}
