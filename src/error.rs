//! Error types for Twittercast

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TwittercastError>;

#[derive(Error, Debug)]
pub enum TwittercastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Login error: {0}")]
    Login(#[from] LoginError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Errors raised while building an [`crate::config::AuthConfig`] or
/// constructing the manager. A missing API key is the one unconditionally
/// fatal precondition: no operation is meaningful without it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API key is missing or empty")]
    MissingApiKey,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Errors produced by the login path.
///
/// These are always returned, never panicked: a failed login leaves every
/// session slot exactly as it was. `Clone` is required for retry logic.
#[derive(Error, Debug, Clone)]
pub enum LoginError {
    /// The platform rejected the supplied credentials.
    #[error("Authentication rejected: {0}")]
    Rejected(String),

    /// No usable credential bundle was configured for any login method.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// HTTP 429 from the platform, surfaced distinctly so callers can back
    /// off instead of treating it as a permanent auth failure.
    #[error("Rate limited by the platform: {0}")]
    RateLimited(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body matched none of the recognized shapes, or matched
    /// a success shape with the token field missing.
    #[error("Malformed platform response: {0}")]
    MalformedResponse(String),

    /// Non-2xx status that is not a rate-limit signal.
    #[error("Platform returned HTTP {status}: {message}")]
    Http { status: u16, message: String },
}

impl LoginError {
    /// Whether a caller-side retry has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LoginError::RateLimited(_)
                | LoginError::Network(_)
                | LoginError::Timeout(_)
                | LoginError::Http { status: 500..=599, .. }
        )
    }
}
