//! Testing utilities for session-enabled axum applications
//!
//! Alba-style HTTP endpoint testing without running a server, with helpers
//! for sending the session cookie and asserting on `Set-Cookie`.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Router, routing};
//! use kvsession::{Session, SessionLayer, testing};
//!
//! #[tokio::test]
//! async fn test_counter() {
//!     let app = Router::new()
//!         .route("/", routing::get(counter))
//!         .layer(SessionLayer::new(manager));
//!
//!     let first = testing::get(app.clone(), "/")
//!         .execute()
//!         .await
//!         .assert_ok()
//!         .assert_set_cookie("rack.session");
//!     let cookie = first.cookie_pair("rack.session").unwrap();
//!
//!     testing::get(app, "/")
//!         .cookie(&cookie)
//!         .execute()
//!         .await
//!         .assert_no_set_cookie();
//! }
//! ```

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, get, post};
