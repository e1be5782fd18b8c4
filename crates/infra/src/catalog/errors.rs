//! Catalog API error types
//!
//! Provides error classification for catalog operations and the credential
//! failures shared between single-flight waiters.

use std::time::Duration;

use carindex_domain::CarIndexError;
use reqwest::StatusCode;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401/403 or a credential failure
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// 4xx except auth and rate limit
    Client,
    /// Connection failures and timeouts
    Network,
    /// Bad configuration or an undecodable payload
    Config,
}

/// Catalog API operation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// `status` is `None` when the failure came from the credential manager
    /// rather than the catalog endpoint itself.
    #[error("Authentication failed: {message}")]
    Auth { status: Option<u16>, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let code = status.as_u16();
        let message = if body.is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            truncate(body, 256)
        };

        match code {
            401 | 403 => Self::Auth { status: Some(code), message },
            429 => Self::RateLimit(message),
            500..=599 => Self::Server { status: code, message },
            _ => Self::Client { status: code, message },
        }
    }

    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth { .. } => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server { .. } => ApiErrorCategory::Server,
            Self::Client { .. } => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) | Self::Decode(_) => ApiErrorCategory::Config,
        }
    }

    /// A catalog endpoint answered 401; the token was revoked server-side.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Auth { status: Some(401), .. })
    }

    /// Refresh and login both failed. Every later call would fail the same
    /// way, unlike a 401/403 from one endpoint.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::Auth { status: None, .. })
    }

    /// Stable label suitable for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self.category() {
            ApiErrorCategory::Authentication => "auth",
            ApiErrorCategory::RateLimit => "rate_limit",
            ApiErrorCategory::Server => "server",
            ApiErrorCategory::Client => "client",
            ApiErrorCategory::Network => "network",
            ApiErrorCategory::Config => "config",
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".into())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<CarIndexError> for ApiError {
    fn from(err: CarIndexError) -> Self {
        match err {
            CarIndexError::Auth(message) => Self::Auth { status: None, message },
            CarIndexError::Network(message) => Self::Network(message),
            CarIndexError::Config(message) => Self::Config(message),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth { status: None, message: err.to_string() }
    }
}

impl From<ApiError> for CarIndexError {
    fn from(err: ApiError) -> Self {
        match err.category() {
            ApiErrorCategory::Authentication if err.is_credential_failure() => {
                CarIndexError::Auth(err.to_string())
            }
            ApiErrorCategory::Client if matches!(err, ApiError::Client { status: 404, .. }) => {
                CarIndexError::NotFound(err.to_string())
            }
            ApiErrorCategory::Config => CarIndexError::Config(err.to_string()),
            _ => CarIndexError::Network(err.to_string()),
        }
    }
}

/// Credential endpoint failures. `Clone` so every caller awaiting a shared
/// refresh or login receives the same outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("credential endpoint unreachable: {0}")]
    Transport(String),

    #[error("invalid credential response: {0}")]
    InvalidResponse(String),

    #[error("catalog API username/password are not configured")]
    MissingCredentials,
}

impl AuthError {
    /// The refresh token is no longer accepted and a full login is required.
    pub fn is_invalid_grant(&self) -> bool {
        match self {
            Self::Rejected { status: 401, .. } => true,
            Self::Rejected { status: 400, body } => body.contains("invalid_grant"),
            _ => false,
        }
    }
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
