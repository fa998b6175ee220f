//! Configuration for the authentication core
//!
//! All ambient environment access happens here, once, at construction time.
//! The manager itself only ever sees an explicit [`AuthConfig`] value.

use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{ElevatedMethod, Level1Credentials, Level2Credentials};

/// Environment variable names consumed by [`AuthConfig::from_env`].
pub mod env_keys {
    pub const API_KEY: &str = "TWITTERCAST_API_KEY";
    pub const KEY_HEADER: &str = "TWITTERCAST_KEY_HEADER";
    pub const AUTH_METHOD: &str = "TWITTERCAST_AUTH_METHOD";
    pub const SESSION_TTL_HOURS: &str = "TWITTERCAST_SESSION_TTL_HOURS";
    pub const BASE_URL: &str = "TWITTERCAST_BASE_URL";
    pub const TIMEOUT_SECS: &str = "TWITTERCAST_TIMEOUT_SECS";
    pub const LOGIN_RETRIES: &str = "TWITTERCAST_LOGIN_RETRIES";
    pub const RETRY_BACKOFF_MS: &str = "TWITTERCAST_RETRY_BACKOFF_MS";
    pub const USER_NAME: &str = "TWITTERCAST_USER_NAME";
    pub const EMAIL: &str = "TWITTERCAST_EMAIL";
    pub const PASSWORD: &str = "TWITTERCAST_PASSWORD";
    pub const TOTP_SECRET: &str = "TWITTERCAST_TOTP_SECRET";
    pub const PROXY: &str = "TWITTERCAST_PROXY";
}

/// How the API key is attached to outgoing requests.
///
/// Both forms are used by deployments of the platform, so the choice is
/// configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyHeaderStyle {
    /// `x-api-key: <key>`
    XApiKey,
    /// `Authorization: Bearer <key>`
    Bearer,
}

impl KeyHeaderStyle {
    /// Header name/value pair for the given key.
    pub fn header_pair(&self, api_key: &str) -> (String, String) {
        match self {
            KeyHeaderStyle::XApiKey => ("x-api-key".to_string(), api_key.to_string()),
            KeyHeaderStyle::Bearer => {
                ("Authorization".to_string(), format!("Bearer {}", api_key))
            }
        }
    }
}

impl FromStr for KeyHeaderStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x-api-key" | "x_api_key" => Ok(KeyHeaderStyle::XApiKey),
            "bearer" | "authorization" => Ok(KeyHeaderStyle::Bearer),
            _ => Err(format!(
                "Invalid key header style: '{}'. Valid options: x-api-key, bearer",
                s
            )),
        }
    }
}

/// Settings for the HTTP transport underneath the login flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    pub base_url: String,
    /// Bound on each individual request; login must never hang a caller.
    pub timeout: Duration,
    /// Additional attempts after the first, applied to 5xx and network
    /// failures only. Rate-limit responses are never retried here.
    pub retry_count: u32,
    pub retry_backoff: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twitterapi.io".to_string(),
            timeout: Duration::from_secs(30),
            retry_count: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Explicit configuration for [`crate::manager::AuthManager`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Primary credential. Must be non-empty; everything else is optional.
    pub api_key: String,
    pub key_header: KeyHeaderStyle,
    /// Tie-breaker when both elevated sessions are valid, and the mechanism
    /// the unified login tries first.
    pub preferred_method: ElevatedMethod,
    /// Validity window stored with a freshly created or refreshed session.
    pub session_ttl: Duration,
    pub level1: Option<Level1Credentials>,
    pub level2: Option<Level2Credentials>,
    pub transport: TransportConfig,
}

impl AuthConfig {
    /// Configuration with the given key and defaults for everything else.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            key_header: KeyHeaderStyle::XApiKey,
            preferred_method: ElevatedMethod::Level1,
            session_ttl: Duration::from_secs(24 * 60 * 60),
            level1: None,
            level2: None,
            transport: TransportConfig::default(),
        }
    }

    pub fn with_preferred_method(mut self, method: ElevatedMethod) -> Self {
        self.preferred_method = method;
        self
    }

    pub fn with_key_header(mut self, style: KeyHeaderStyle) -> Self {
        self.key_header = style;
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_level1(mut self, creds: Level1Credentials) -> Self {
        self.level1 = Some(creds);
        self
    }

    pub fn with_level2(mut self, creds: Level2Credentials) -> Self {
        self.level2 = Some(creds);
        self
    }

    /// Build configuration from `TWITTERCAST_*` environment variables.
    ///
    /// This is the only place the crate reads the process environment. The
    /// credential triple (user name, email, password) feeds both elevated
    /// login mechanisms; the TOTP secret only applies to level 1.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApiKey` when the key variable is unset
    /// or empty, and `ConfigError::InvalidValue` for unparseable overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = read_env(env_keys::API_KEY).ok_or(ConfigError::MissingApiKey)?;
        let mut config = AuthConfig::new(api_key);

        if let Some(style) = read_env(env_keys::KEY_HEADER) {
            config.key_header = style.parse().map_err(|reason| ConfigError::InvalidValue {
                field: env_keys::KEY_HEADER.to_string(),
                reason,
            })?;
        }
        if let Some(method) = read_env(env_keys::AUTH_METHOD) {
            config.preferred_method =
                method.parse().map_err(|reason| ConfigError::InvalidValue {
                    field: env_keys::AUTH_METHOD.to_string(),
                    reason,
                })?;
        }
        if let Some(hours) = read_env(env_keys::SESSION_TTL_HOURS) {
            let hours: u64 = parse_env(env_keys::SESSION_TTL_HOURS, &hours)?;
            config.session_ttl = Duration::from_secs(hours * 60 * 60);
        }
        if let Some(url) = read_env(env_keys::BASE_URL) {
            config.transport.base_url = url;
        }
        if let Some(secs) = read_env(env_keys::TIMEOUT_SECS) {
            config.transport.timeout =
                Duration::from_secs(parse_env(env_keys::TIMEOUT_SECS, &secs)?);
        }
        if let Some(retries) = read_env(env_keys::LOGIN_RETRIES) {
            config.transport.retry_count = parse_env(env_keys::LOGIN_RETRIES, &retries)?;
        }
        if let Some(ms) = read_env(env_keys::RETRY_BACKOFF_MS) {
            config.transport.retry_backoff =
                Duration::from_millis(parse_env(env_keys::RETRY_BACKOFF_MS, &ms)?);
        }

        let user_name = read_env(env_keys::USER_NAME);
        let email = read_env(env_keys::EMAIL);
        let password = read_env(env_keys::PASSWORD);
        let totp_secret = read_env(env_keys::TOTP_SECRET);
        let proxy = read_env(env_keys::PROXY);

        if let (Some(user_name), Some(email), Some(password)) =
            (user_name, email, password)
        {
            config.level1 = Some(Level1Credentials {
                user_name: user_name.clone(),
                email: email.clone(),
                password: SecretString::from(password.clone()),
                totp_secret: totp_secret.map(SecretString::from),
                proxy: proxy.clone(),
            });
            config.level2 = Some(Level2Credentials {
                user_name,
                email,
                password: SecretString::from(password),
                proxy,
            });
        }

        Ok(config)
    }
}

/// Read a variable, treating unset and empty identically.
fn read_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn parse_env<T: FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{}' is not a valid number", raw),
    })
}
