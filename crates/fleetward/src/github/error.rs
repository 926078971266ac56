//! GitHub API error types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that can occur when talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The response body did not decode into the expected type.
    #[error("Malformed response from {endpoint}: {source}")]
    MalformedResponse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// GitHub rejected the request (4xx other than auth/not-found/rate-limit).
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// GitHub failed on its side.
    #[error("GitHub server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited {
        reset_at: DateTime<Utc>,
        retry_after: Option<Duration>,
    },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl GitHubError {
    /// Errors worth another attempt: rate limits, 5xx and transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Server { .. } | Self::RateLimited { .. }
        )
    }

    /// Pause the server asked for before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Whether this is a 422 whose message contains `needle`
    /// (GitHub reports "Reference already exists" and friends this way).
    pub fn is_unprocessable(&self, needle: &str) -> bool {
        matches!(self, Self::Api { status: 422, message } if message.contains(needle))
    }
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Http(message) => PlatformError::Network { message },
            GitHubError::MalformedResponse { endpoint, source } => {
                PlatformError::MalformedResponse {
                    endpoint,
                    message: source.to_string(),
                }
            }
            GitHubError::Api { status, message } => PlatformError::Api { status, message },
            GitHubError::Server { status, message } => PlatformError::Server { status, message },
            GitHubError::RateLimited { reset_at, .. } => PlatformError::RateLimited { reset_at },
            GitHubError::AuthRequired => PlatformError::AuthRequired,
            GitHubError::NotFound(resource) => PlatformError::NotFound { resource },
            GitHubError::Config(message) => PlatformError::Internal { message },
        }
    }
}

/// Short, single-line description for retry logs.
pub fn short_error_message(err: &GitHubError) -> String {
    match err {
        GitHubError::Http(_) => "Network error".to_string(),
        GitHubError::MalformedResponse { endpoint, .. } => format!("Malformed response: {endpoint}"),
        GitHubError::Api { status, message } | GitHubError::Server { status, message } => {
            if message.chars().count() > 50 {
                let truncated: String = message.chars().take(47).collect();
                format!("HTTP {status}: {truncated}...")
            } else {
                format!("HTTP {status}: {message}")
            }
        }
        GitHubError::RateLimited { .. } => "Rate limited".to_string(),
        GitHubError::AuthRequired => "Authentication required".to_string(),
        GitHubError::NotFound(resource) => format!("Not found: {resource}"),
        GitHubError::Config(msg) => format!("Config: {msg}"),
    }
}
