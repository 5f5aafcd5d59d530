use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The main error type for kvsession
///
/// Note that an unknown or malformed session identifier is never an error:
/// it degrades to an empty session. Only failures of the backing store,
/// serialization and configuration are reported here.
#[derive(Debug, thiserror::Error)]
pub enum KvSessionError {
    #[error("Session store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Error response body sent to clients
#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
    error_id: String,
}

impl KvSessionError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the backing store
    pub fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Convert error to a response
    ///
    /// # Security
    ///
    /// Error details are only exposed when `dev_mode` is `true`. Otherwise
    /// clients receive a generic message and the full error is only logged.
    pub fn into_response_with_mode(self, dev_mode: bool) -> Response {
        let status = self.status_code();

        let error_msg = if dev_mode {
            self.to_string()
        } else {
            self.safe_message()
        };

        let error_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorResponse {
            error: error_msg,
            error_id,
        });

        (status, body).into_response()
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) | Self::Internal(_) | Self::Anyhow(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a message that is safe to show to clients
    fn safe_message(&self) -> String {
        match self {
            Self::Store(_) => "Session store unavailable".to_string(),
            Self::Serialization(_) => "Internal server error".to_string(),
            Self::Config(_) | Self::Internal(_) | Self::Anyhow(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for KvSessionError {
    fn into_response(self) -> Response {
        self.into_response_with_mode(false)
    }
}

/// Result type alias for kvsession
pub type Result<T> = std::result::Result<T, KvSessionError>;

impl From<serde_json::Error> for KvSessionError {
    fn from(err: serde_json::Error) -> Self {
        KvSessionError::Serialization(err.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for KvSessionError {
    fn from(err: redis::RedisError) -> Self {
        KvSessionError::Store(format!("Redis error: {}", err))
    }
}
