use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigServerError {
    #[error("{0}")]
    IllegalArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unsupported(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(
        "server shutdown failed, cur-session count: {sessions}, shutdown will succeed once it drops to 0"
    )]
    SessionsInFlight { sessions: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, ConfigServerError>;

impl ConfigServerError {
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Prefix storage failures with what the caller was doing.
    pub fn context(self, context: &str) -> Self {
        match self {
            Self::Storage(message) => Self::Storage(format!("{context}: {message}")),
            other => other,
        }
    }

    /// HTTP status mirrored into the response envelope.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::IllegalArgument(_) | Self::Unsupported(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_)
            | Self::Serialization(_)
            | Self::SessionsInFlight { .. }
            | Self::Config(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for ConfigServerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ConfigServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_failure_taxonomy() {
        assert_eq!(
            ConfigServerError::illegal_argument("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConfigServerError::unsupported("x").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ConfigServerError::not_found("x").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ConfigServerError::storage("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ConfigServerError::SessionsInFlight { sessions: 2 }.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn context_only_decorates_storage_failures() {
        let err = ConfigServerError::storage("disk full").context("query ob clusters");
        assert_eq!(err.to_string(), "storage error: query ob clusters: disk full");

        let err = ConfigServerError::not_found("c1").context("query ob clusters");
        assert_eq!(err.to_string(), "c1");
    }

    #[test]
    fn session_error_mentions_shutdown_failure() {
        let err = ConfigServerError::SessionsInFlight { sessions: 3 };
        assert!(err.to_string().contains("server shutdown failed"));
        assert!(err.to_string().contains("3"));
    }
}
