//! Operator-facing introspection and error classification
//!
//! Everything here is advisory: classification output feeds reports, never
//! control flow. The debug snapshot is a fixed, versioned struct so tests
//! and tooling can assert on its exact shape, and it never carries a full
//! secret value.

use serde::Serialize;

use crate::config::{env_keys, AuthConfig, KeyHeaderStyle};
use crate::error::LoginError;
use crate::types::{AuthLevel, ElevatedMethod};

/// Bump when the [`DebugInfo`] shape changes.
pub const DEBUG_INFO_VERSION: u32 = 1;

/// Per-slot view inside [`DebugInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionDebug {
    pub valid: bool,
    /// Present only while the session is valid.
    pub expires_in_secs: Option<i64>,
}

/// Which expected configuration inputs are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialPresence {
    pub api_key: bool,
    pub user_name: bool,
    pub email: bool,
    pub password: bool,
    pub totp_secret: bool,
    pub proxy: bool,
}

impl CredentialPresence {
    pub fn from_config(config: &AuthConfig) -> Self {
        let level1 = config.level1.as_ref();
        Self {
            api_key: !config.api_key.trim().is_empty(),
            user_name: level1.map(|c| !c.user_name.is_empty()).unwrap_or(false)
                || config
                    .level2
                    .as_ref()
                    .map(|c| !c.user_name.is_empty())
                    .unwrap_or(false),
            email: level1.map(|c| !c.email.is_empty()).unwrap_or(false)
                || config
                    .level2
                    .as_ref()
                    .map(|c| !c.email.is_empty())
                    .unwrap_or(false),
            password: level1.is_some() || config.level2.is_some(),
            totp_secret: level1.map(|c| c.totp_secret.is_some()).unwrap_or(false),
            proxy: level1.map(|c| c.proxy.is_some()).unwrap_or(false)
                || config
                    .level2
                    .as_ref()
                    .map(|c| c.proxy.is_some())
                    .unwrap_or(false),
        }
    }

    /// Environment variable names of the required inputs that are absent.
    /// TOTP and proxy are optional and never listed.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.api_key {
            missing.push(env_keys::API_KEY);
        }
        if !self.user_name {
            missing.push(env_keys::USER_NAME);
        }
        if !self.email {
            missing.push(env_keys::EMAIL);
        }
        if !self.password {
            missing.push(env_keys::PASSWORD);
        }
        missing
    }
}

/// Versioned introspection snapshot returned by
/// [`crate::manager::AuthManager::debug_info`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugInfo {
    pub version: u32,
    pub current_level: AuthLevel,
    pub preferred_method: ElevatedMethod,
    pub key_header: KeyHeaderStyle,
    /// Short prefix of the key only.
    pub api_key_preview: String,
    pub api_key_valid: bool,
    pub level1_session: SessionDebug,
    pub level2_session: SessionDebug,
    pub credentials: CredentialPresence,
}

/// Render a secret as a short prefix plus padding. Secrets at or below the
/// prefix length are fully masked.
pub fn mask_secret(secret: &str) -> String {
    const PREFIX: usize = 4;
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    if secret.chars().count() <= PREFIX {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(PREFIX).collect();
    format!("{}****", prefix)
}

/// Broad failure category for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Credentials,
    RateLimit,
    Network,
    Protocol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing will work until an operator intervenes.
    Fatal,
    /// The operation failed and a plain retry will not help.
    Error,
    /// Transient; retry with backoff is appropriate.
    Warning,
}

/// Advisory classification of a login failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorClassification {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub retryable: bool,
    pub likely_causes: Vec<&'static str>,
    pub remediation: &'static str,
}

/// Turn a login error into a structured report entry.
pub fn classify_login_error(error: &LoginError) -> ErrorClassification {
    match error {
        LoginError::MissingCredentials(_) => ErrorClassification {
            kind: ErrorKind::Configuration,
            severity: Severity::Fatal,
            retryable: false,
            likely_causes: vec![
                "credential environment variables unset",
                "credential bundle incomplete (user name, email and password are all required)",
            ],
            remediation: "Set the TWITTERCAST_USER_NAME, TWITTERCAST_EMAIL and TWITTERCAST_PASSWORD variables and restart.",
        },
        LoginError::Rejected(_) => ErrorClassification {
            kind: ErrorKind::Credentials,
            severity: Severity::Error,
            retryable: false,
            likely_causes: vec![
                "wrong password",
                "account locked or challenged",
                "second factor required or rejected",
            ],
            remediation: "Verify the account credentials and TOTP secret, then log in again.",
        },
        LoginError::RateLimited(_) => ErrorClassification {
            kind: ErrorKind::RateLimit,
            severity: Severity::Warning,
            retryable: true,
            likely_causes: vec!["too many login attempts in a short window"],
            remediation: "Back off and retry later; do not treat this as an auth failure.",
        },
        LoginError::Network(_) | LoginError::Timeout(_) => ErrorClassification {
            kind: ErrorKind::Network,
            severity: Severity::Warning,
            retryable: true,
            likely_causes: vec!["connectivity problem", "platform outage", "slow proxy"],
            remediation: "Check network/proxy reachability and retry.",
        },
        LoginError::MalformedResponse(_) => ErrorClassification {
            kind: ErrorKind::Protocol,
            severity: Severity::Error,
            retryable: false,
            likely_causes: vec![
                "platform changed its response shape",
                "intermediary returned a non-JSON body",
            ],
            remediation: "Capture the response body and update the recognized shapes.",
        },
        LoginError::Http { status, .. } => match status {
            401 | 403 => ErrorClassification {
                kind: ErrorKind::Credentials,
                severity: Severity::Error,
                retryable: false,
                likely_causes: vec!["unauthorized API key", "key revoked or over quota"],
                remediation: "Verify the API key with the platform dashboard.",
            },
            500..=599 => ErrorClassification {
                kind: ErrorKind::Network,
                severity: Severity::Warning,
                retryable: true,
                likely_causes: vec!["platform-side failure"],
                remediation: "Retry with backoff; escalate if it persists.",
            },
            _ => ErrorClassification {
                kind: ErrorKind::Protocol,
                severity: Severity::Error,
                retryable: false,
                likely_causes: vec!["unexpected status for a login endpoint"],
                remediation: "Inspect the request payload and platform changelog.",
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "<empty>");
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("abcd"), "****");
        assert_eq!(mask_secret("abcdefghijklmnop"), "abcd****");
    }

    #[test]
    fn test_mask_secret_never_contains_tail() {
        let masked = mask_secret("abcd-very-secret-tail");
        assert!(!masked.contains("secret"));
        assert!(!masked.contains("tail"));
    }

    #[test]
    fn test_presence_missing_lists_env_names() {
        let config = AuthConfig::new("abcdefghijklmnop");
        let presence = CredentialPresence::from_config(&config);
        let missing = presence.missing();
        assert!(missing.contains(&env_keys::USER_NAME));
        assert!(missing.contains(&env_keys::EMAIL));
        assert!(missing.contains(&env_keys::PASSWORD));
        assert!(!missing.contains(&env_keys::API_KEY));
        assert!(!missing.contains(&env_keys::TOTP_SECRET));
    }

    #[test]
    fn test_classification_of_rate_limit() {
        let class = classify_login_error(&LoginError::RateLimited("busy".to_string()));
        assert_eq!(class.kind, ErrorKind::RateLimit);
        assert_eq!(class.severity, Severity::Warning);
        assert!(class.retryable);
    }

    #[test]
    fn test_classification_of_rejection_is_not_retryable() {
        let class = classify_login_error(&LoginError::Rejected("nope".to_string()));
        assert_eq!(class.kind, ErrorKind::Credentials);
        assert!(!class.retryable);
    }

    #[test]
    fn test_classification_of_http_statuses() {
        let unauthorized = classify_login_error(&LoginError::Http {
            status: 401,
            message: "unauthorized".to_string(),
        });
        assert_eq!(unauthorized.kind, ErrorKind::Credentials);

        let server = classify_login_error(&LoginError::Http {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert_eq!(server.kind, ErrorKind::Network);
        assert!(server.retryable);
    }

    #[test]
    fn test_classification_of_timeout() {
        let class = classify_login_error(&LoginError::Timeout(Duration::from_secs(30)));
        assert_eq!(class.kind, ErrorKind::Network);
        assert!(class.retryable);
    }

    #[test]
    fn test_classification_agrees_with_is_retryable() {
        let errors = [
            LoginError::Rejected("x".to_string()),
            LoginError::MissingCredentials("x".to_string()),
            LoginError::RateLimited("x".to_string()),
            LoginError::Network("x".to_string()),
            LoginError::Timeout(Duration::from_secs(1)),
            LoginError::MalformedResponse("x".to_string()),
            LoginError::Http {
                status: 401,
                message: "x".to_string(),
            },
            LoginError::Http {
                status: 502,
                message: "x".to_string(),
            },
        ];
        for error in &errors {
            assert_eq!(
                classify_login_error(error).retryable,
                error.is_retryable(),
                "{:?}",
                error
            );
        }
    }
}
