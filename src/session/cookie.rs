//! Session cookie codec
//!
//! Extracts the session identifier from inbound `Cookie` headers and renders
//! the outbound `Set-Cookie` value. The codec never looks at session data.

use super::config::SessionConfig;
use super::id::SessionId;
use crate::error::{KvSessionError, Result};
use axum::http::{HeaderMap, HeaderValue, header};
use ::cookie::Cookie;
use ::cookie::time::{Duration, OffsetDateTime};

/// Cookie codec for session identifiers
#[derive(Debug, Clone)]
pub struct CookieCodec {
    config: SessionConfig,
}

impl CookieCodec {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Name of the session cookie
    pub fn key(&self) -> &str {
        &self.config.key
    }

    /// Extract the session identifier from request headers
    ///
    /// Returns `None` when the cookie is absent, the header is not valid
    /// text, or the value is not a well-formed identifier. Browsers may send
    /// several `Cookie` headers; all of them are searched and the first
    /// well-formed value wins.
    pub fn extract(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| Cookie::split_parse(raw).filter_map(|c| c.ok()))
            .filter(|c| c.name() == self.config.key)
            .find_map(|c| SessionId::parse(c.value()))
    }

    /// Build the session cookie with all configured attributes
    pub fn build_cookie(&self, id: &SessionId) -> Cookie<'static> {
        let mut builder = Cookie::build((self.config.key.clone(), id.as_str().to_string()))
            .path(self.config.path.clone())
            .http_only(self.config.http_only)
            .secure(self.config.secure)
            .same_site(::cookie::SameSite::from(self.config.same_site));

        if let Some(ref domain) = self.config.domain {
            builder = builder.domain(domain.clone());
        }

        if let Some(expire_after) = self.config.expire_after() {
            let max_age = Duration::seconds(i64::try_from(expire_after.as_secs()).unwrap_or(i64::MAX));
            builder = builder.max_age(max_age);
            // Expires is only a fallback for clients without Max-Age support
            if let Some(expires) = OffsetDateTime::now_utc().checked_add(max_age) {
                builder = builder.expires(expires);
            }
        }

        builder.build()
    }

    /// Render a `Set-Cookie` header value for `id`
    pub fn encode(&self, id: &SessionId) -> Result<HeaderValue> {
        let rendered = self.build_cookie(id).to_string();
        HeaderValue::from_str(&rendered)
            .map_err(|e| KvSessionError::internal(format!("Invalid Set-Cookie header: {}", e)))
    }
}
