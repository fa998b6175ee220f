//! Core domain types for the authentication core

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Authorization level, ordered by privilege.
///
/// `None < ApiKey < SessionLevel1 < SessionLevel2`. The endpoint policy only
/// ever *requires* `ApiKey` or `SessionLevel1`; because the levels are
/// ordered, any valid elevated session satisfies a user-session requirement.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    None,
    ApiKey,
    SessionLevel1,
    SessionLevel2,
}

impl fmt::Display for AuthLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthLevel::None => "none",
            AuthLevel::ApiKey => "api_key",
            AuthLevel::SessionLevel1 => "session_level_1",
            AuthLevel::SessionLevel2 => "session_level_2",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AuthLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(AuthLevel::None),
            "api_key" => Ok(AuthLevel::ApiKey),
            "session_level_1" => Ok(AuthLevel::SessionLevel1),
            "session_level_2" => Ok(AuthLevel::SessionLevel2),
            _ => Err(format!(
                "Invalid auth level: '{}'. Valid options: none, api_key, session_level_1, session_level_2",
                s
            )),
        }
    }
}

/// One of the two elevated login mechanisms the platform offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevatedMethod {
    Level1,
    Level2,
}

impl ElevatedMethod {
    /// The auth level a valid session of this method grants.
    pub fn level(&self) -> AuthLevel {
        match self {
            ElevatedMethod::Level1 => AuthLevel::SessionLevel1,
            ElevatedMethod::Level2 => AuthLevel::SessionLevel2,
        }
    }

    /// Request-body parameter name carrying this method's session token.
    pub fn token_param(&self) -> &'static str {
        match self {
            ElevatedMethod::Level1 => "auth_session",
            ElevatedMethod::Level2 => "login_cookie",
        }
    }

    /// The other login mechanism.
    pub fn other(&self) -> ElevatedMethod {
        match self {
            ElevatedMethod::Level1 => ElevatedMethod::Level2,
            ElevatedMethod::Level2 => ElevatedMethod::Level1,
        }
    }
}

impl fmt::Display for ElevatedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElevatedMethod::Level1 => write!(f, "level_1"),
            ElevatedMethod::Level2 => write!(f, "level_2"),
        }
    }
}

impl FromStr for ElevatedMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "level_1" | "level1" | "v1" => Ok(ElevatedMethod::Level1),
            "level_2" | "level2" | "v2" => Ok(ElevatedMethod::Level2),
            _ => Err(format!(
                "Invalid elevated method: '{}'. Valid options: level_1, level_2",
                s
            )),
        }
    }
}

/// An elevated session held in one of the two independent slots.
///
/// A slot is either fully populated or absent; there is no partial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque session identifier returned by the platform's login endpoint.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && now < self.expires_at
    }

    /// Whole seconds until expiry, clamped at zero.
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Result of a successful login: the stored token and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub method: ElevatedMethod,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Point-in-time snapshot of the manager's authentication state.
///
/// Computed on demand from the stored key and session slots; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    pub api_key_valid: bool,
    pub v1_session_valid: bool,
    pub v2_session_valid: bool,
    /// Highest level currently satisfiable, after the preference tie-break.
    pub current_level: AuthLevel,
    pub valid_levels: BTreeSet<AuthLevel>,
    /// True iff at least one elevated session is valid.
    pub can_perform_user_actions: bool,
}

/// Credentials for the level-1 login mechanism (supports TOTP).
#[derive(Debug)]
pub struct Level1Credentials {
    pub user_name: String,
    pub email: String,
    pub password: SecretString,
    pub totp_secret: Option<SecretString>,
    pub proxy: Option<String>,
}

impl Clone for Level1Credentials {
    fn clone(&self) -> Self {
        Self {
            user_name: self.user_name.clone(),
            email: self.email.clone(),
            password: SecretString::from(self.password.expose_secret().to_owned()),
            totp_secret: self
                .totp_secret
                .as_ref()
                .map(|s| SecretString::from(s.expose_secret().to_owned())),
            proxy: self.proxy.clone(),
        }
    }
}

/// Credentials for the level-2 login mechanism (no TOTP field).
#[derive(Debug)]
pub struct Level2Credentials {
    pub user_name: String,
    pub email: String,
    pub password: SecretString,
    pub proxy: Option<String>,
}

impl Clone for Level2Credentials {
    fn clone(&self) -> Self {
        Self {
            user_name: self.user_name.clone(),
            email: self.email.clone(),
            password: SecretString::from(self.password.expose_secret().to_owned()),
            proxy: self.proxy.clone(),
        }
    }
}
