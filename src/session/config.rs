use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::error::{KvSessionError, Result};
use crate::utils::{env_flag, get_env_with_prefix};

/// Longest cookie lifetime browsers honour (400 days, RFC 6265bis)
pub const MAX_EXPIRE_AFTER_SECONDS: u64 = 400 * 24 * 3600;

/// SameSite attribute for the session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

impl From<SameSitePolicy> for ::cookie::SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        match policy {
            SameSitePolicy::Strict => ::cookie::SameSite::Strict,
            SameSitePolicy::Lax => ::cookie::SameSite::Lax,
            SameSitePolicy::None => ::cookie::SameSite::None,
        }
    }
}

/// What to do when the backing store fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreErrorPolicy {
    /// Fail the request with a server error (default)
    #[default]
    Fail,
    /// Continue with a session that lives only for this request
    Ephemeral,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Cookie name
    #[serde(default = "default_key")]
    pub key: String,

    /// Cookie domain (optional)
    #[serde(default)]
    pub domain: Option<String>,

    /// Cookie path
    #[serde(default = "default_path")]
    pub path: String,

    /// Session lifetime in seconds
    ///
    /// When set, the cookie carries `Max-Age`/`Expires`, backing entries get
    /// this TTL, and the cookie is re-sent on every committed request so the
    /// expiry slides forward. When unset, the cookie lives for the browser
    /// session and entries use the backend's default TTL.
    #[serde(default)]
    pub expire_after_seconds: Option<u64>,

    /// Cookie http_only flag
    #[serde(default = "default_http_only")]
    pub http_only: bool,

    /// Cookie secure flag (HTTPS only)
    #[serde(default)]
    pub secure: bool,

    /// Cookie SameSite attribute
    #[serde(default)]
    pub same_site: SameSitePolicy,

    /// Prefix for backing store keys
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Only create sessions that are written to
    ///
    /// When `true`, a request that arrives without a valid session and never
    /// writes to it persists nothing and gets no cookie.
    #[serde(default)]
    pub lazy: bool,

    /// Behavior when the backing store fails
    #[serde(default)]
    pub on_store_error: StoreErrorPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            domain: None,
            path: default_path(),
            expire_after_seconds: None,
            http_only: default_http_only(),
            secure: false,
            same_site: SameSitePolicy::default(),
            namespace: default_namespace(),
            lazy: false,
            on_store_error: StoreErrorPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Create a new SessionConfig builder
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }

    /// Load session configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(key) = get_env_with_prefix("SESSION_KEY") {
            config.key = key;
        }

        if let Some(domain) = get_env_with_prefix("SESSION_COOKIE_DOMAIN") {
            config.domain = Some(domain);
        }

        if let Some(path) = get_env_with_prefix("SESSION_COOKIE_PATH") {
            config.path = path;
        }

        if let Some(expire) = get_env_with_prefix("SESSION_EXPIRE_AFTER_SECONDS") {
            if let Ok(seconds) = expire.parse() {
                config.expire_after_seconds = Some(seconds);
            }
        }

        config.http_only = env_flag("SESSION_COOKIE_HTTP_ONLY", config.http_only);
        config.secure = env_flag("SESSION_COOKIE_SECURE", config.secure);
        config.lazy = env_flag("SESSION_LAZY", config.lazy);

        if let Some(same_site) = get_env_with_prefix("SESSION_COOKIE_SAME_SITE") {
            config.same_site = match same_site.to_lowercase().as_str() {
                "strict" => SameSitePolicy::Strict,
                "none" => SameSitePolicy::None,
                _ => SameSitePolicy::Lax,
            };
        }

        if let Some(namespace) = get_env_with_prefix("SESSION_NAMESPACE") {
            config.namespace = namespace;
        }

        if let Some(policy) = get_env_with_prefix("SESSION_ON_STORE_ERROR") {
            config.on_store_error = match policy.to_lowercase().as_str() {
                "ephemeral" => StoreErrorPolicy::Ephemeral,
                _ => StoreErrorPolicy::Fail,
            };
        }

        config
    }

    /// Session lifetime, if configured
    pub fn expire_after(&self) -> Option<Duration> {
        self.expire_after_seconds.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(KvSessionError::config("session cookie key must not be empty"));
        }
        if self
            .key
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, ';' | ',' | '='))
        {
            return Err(KvSessionError::config(format!(
                "session cookie key '{}' contains characters not allowed in a cookie name",
                self.key
            )));
        }
        if !self.path.starts_with('/') {
            return Err(KvSessionError::config("session cookie path must start with '/'"));
        }
        if self.expire_after_seconds == Some(0) {
            return Err(KvSessionError::config("expire_after_seconds must be greater than zero"));
        }
        if let Some(seconds) = self.expire_after_seconds {
            if seconds > MAX_EXPIRE_AFTER_SECONDS {
                return Err(KvSessionError::config(format!(
                    "expire_after_seconds must be at most {} (400 days), got {}",
                    MAX_EXPIRE_AFTER_SECONDS, seconds
                )));
            }
        }
        if self.namespace.is_empty() {
            return Err(KvSessionError::config("session namespace must not be empty"));
        }
        if self.same_site == SameSitePolicy::None && !self.secure {
            tracing::warn!("SameSite=None without Secure is rejected by most browsers");
        }
        Ok(())
    }
}

/// Builder for SessionConfig
#[must_use = "builder does nothing until you call build()"]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.config.key = key.into();
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.config.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    pub fn expire_after(mut self, duration: Duration) -> Self {
        self.config.expire_after_seconds = Some(duration.as_secs());
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.config.http_only = http_only;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn same_site(mut self, same_site: SameSitePolicy) -> Self {
        self.config.same_site = same_site;
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.config.lazy = lazy;
        self
    }

    pub fn on_store_error(mut self, policy: StoreErrorPolicy) -> Self {
        self.config.on_store_error = policy;
        self
    }

    pub fn build(self) -> Result<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SessionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_key() -> String {
    "rack.session".to_string()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_http_only() -> bool {
    true
}

fn default_namespace() -> String {
    "_sessions".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.key, "rack.session");
        assert_eq!(config.path, "/");
        assert!(config.http_only);
        assert!(!config.secure);
        assert!(!config.lazy);
        assert_eq!(config.expire_after(), None);
        assert_eq!(config.on_store_error, StoreErrorPolicy::Fail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::builder()
            .key("_session_id")
            .domain("example.com")
            .expire_after(Duration::from_secs(600))
            .secure(true)
            .same_site(SameSitePolicy::Strict)
            .on_store_error(StoreErrorPolicy::Ephemeral)
            .build()
            .unwrap();

        assert_eq!(config.key, "_session_id");
        assert_eq!(config.domain.as_deref(), Some("example.com"));
        assert_eq!(config.expire_after(), Some(Duration::from_secs(600)));
        assert!(config.secure);
        assert_eq!(config.same_site, SameSitePolicy::Strict);
        assert_eq!(config.on_store_error, StoreErrorPolicy::Ephemeral);
    }

    #[test]
    fn test_invalid_key_rejected() {
        assert!(SessionConfig::builder().key("").build().is_err());
        assert!(SessionConfig::builder().key("a b").build().is_err());
        assert!(SessionConfig::builder().key("a;b").build().is_err());
        assert!(SessionConfig::builder().key("a=b").build().is_err());
    }

    #[test]
    fn test_invalid_path_and_expiry_rejected() {
        assert!(SessionConfig::builder().path("app").build().is_err());
        assert!(SessionConfig::builder()
            .expire_after(Duration::from_millis(500))
            .build()
            .is_err());
    }

    #[test]
    fn test_expiry_upper_bound() {
        let at_cap = SessionConfig {
            expire_after_seconds: Some(MAX_EXPIRE_AFTER_SECONDS),
            ..Default::default()
        };
        assert!(at_cap.validate().is_ok());

        let huge = SessionConfig {
            expire_after_seconds: Some(1_000_000_000_000),
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(KvSessionError::Config(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"key": "sid", "on_store_error": "ephemeral"}"#).unwrap();
        assert_eq!(config.key, "sid");
        assert_eq!(config.path, "/");
        assert_eq!(config.namespace, "_sessions");
        assert_eq!(config.on_store_error, StoreErrorPolicy::Ephemeral);
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("KVSESSION_SESSION_KEY", "env_sid");
            std::env::set_var("KVSESSION_SESSION_EXPIRE_AFTER_SECONDS", "120");
            std::env::set_var("KVSESSION_SESSION_LAZY", "true");
        }
        let config = SessionConfig::from_env();
        unsafe {
            std::env::remove_var("KVSESSION_SESSION_KEY");
            std::env::remove_var("KVSESSION_SESSION_EXPIRE_AFTER_SECONDS");
            std::env::remove_var("KVSESSION_SESSION_LAZY");
        }

        assert_eq!(config.key, "env_sid");
        assert_eq!(config.expire_after_seconds, Some(120));
        assert!(config.lazy);
    }
}
