//! Tower middleware running the session lifecycle around a service

use super::handle::Session;
use super::manager::SessionManager;
use axum::{
    extract::Request,
    http::header,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::sync::Arc;
use tower::{Layer, Service};

/// Tower layer for session handling
///
/// Loads the session before the inner service runs, exposes it as a
/// [`Session`] extension and commits it afterwards, adding a `Set-Cookie`
/// header when required. Store failures under the `fail` policy replace the
/// response with a 500.
///
/// # Example
///
/// ```rust,ignore
/// let manager = SessionManager::new(store, SessionConfig::default());
/// let app = Router::new()
///     .route("/", get(counter))
///     .layer(SessionLayer::new(manager));
/// ```
#[derive(Clone)]
pub struct SessionLayer {
    manager: Arc<SessionManager>,
}

impl SessionLayer {
    pub fn new(manager: SessionManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    pub fn from_shared(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }
}

impl<S> Layer<S> for SessionLayer {
    type Service = SessionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionService {
            inner,
            manager: self.manager.clone(),
        }
    }
}

/// Tower service for session handling
#[derive(Clone)]
pub struct SessionService<S> {
    inner: S,
    manager: Arc<SessionManager>,
}

impl<S> Service<Request> for SessionService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let manager = self.manager.clone();
        // Use the instance that was polled ready, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let loaded = match manager.begin(req.headers()).await {
                Ok(loaded) => loaded,
                Err(e) => return Ok(e.into_response()),
            };
            let (ticket, data) = loaded.into_parts();

            let session = Session::new(ticket.id().cloned(), data);
            req.extensions_mut().insert(session.clone());

            let mut response = inner.call(req).await?;

            match manager.commit(ticket, session.take_outcome()).await {
                Ok(result) => {
                    if let Some(set_cookie) = result.set_cookie {
                        response.headers_mut().append(header::SET_COOKIE, set_cookie);
                    }
                    Ok(response)
                }
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}
