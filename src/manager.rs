//! Tiered authentication and session manager
//!
//! Tracks three progressively privileged credential types: the long-lived
//! API key supplied at construction, and two independent elevated session
//! slots obtained through the platform's two login mechanisms. Reads are
//! pure snapshots over stored state; logins are the only mutations and are
//! single-flight per slot.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use secrecy::ExposeSecret;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::diagnostics::{CredentialPresence, DebugInfo, SessionDebug, DEBUG_INFO_VERSION};
use crate::error::{ConfigError, LoginError, Result};
use crate::policy::EndpointPolicy;
use crate::response::normalize_login_response;
use crate::transport::{HttpTransport, LoginTransport};
use crate::types::{
    AuthLevel, AuthStatus, ElevatedMethod, Level1Credentials, Level2Credentials, Session,
    SessionGrant,
};

/// Level-1 login endpoint (auth-session mechanism, supports TOTP).
const LEVEL1_LOGIN_PATH: &str = "/twitter/login";
/// Level-2 login endpoint (login-cookie mechanism).
const LEVEL2_LOGIN_PATH: &str = "/twitter/user_login_v2";
/// Cheap read endpoint used by [`AuthManager::test_connection`].
const CONNECTION_TEST_PATH: &str = "/twitter/user/info";

/// One elevated session slot. State reads never block on an in-flight
/// login; the async guard serializes the write path only.
struct SessionSlot {
    state: RwLock<Option<Session>>,
    login_guard: tokio::sync::Mutex<()>,
}

impl SessionSlot {
    fn new() -> Self {
        Self {
            state: RwLock::new(None),
            login_guard: tokio::sync::Mutex::new(()),
        }
    }

    fn valid_session(&self, now: DateTime<Utc>) -> Option<Session> {
        self.state
            .read()
            .as_ref()
            .filter(|s| s.is_valid_at(now))
            .cloned()
    }
}

/// The authentication core.
///
/// Construct it with an [`AuthConfig`]; the only fatal precondition is an
/// empty API key. All login failures come back as [`LoginError`] values and
/// never disturb an existing session at another level.
pub struct AuthManager {
    config: AuthConfig,
    policy: EndpointPolicy,
    transport: Arc<dyn LoginTransport>,
    level1: SessionSlot,
    level2: SessionSlot,
}

impl AuthManager {
    /// Build a manager with the real HTTP transport.
    ///
    /// # Errors
    ///
    /// `ConfigError::MissingApiKey` when the configured key is empty.
    pub fn new(config: AuthConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.transport)?);
        Self::with_transport(config, transport)
    }

    /// Build a manager over an injected transport (tests, custom stacks).
    pub fn with_transport(
        config: AuthConfig,
        transport: Arc<dyn LoginTransport>,
    ) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }
        Ok(Self {
            config,
            policy: EndpointPolicy::default(),
            transport,
            level1: SessionSlot::new(),
            level2: SessionSlot::new(),
        })
    }

    /// Replace the default endpoint policy.
    pub fn with_policy(mut self, policy: EndpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn slot(&self, method: ElevatedMethod) -> &SessionSlot {
        match method {
            ElevatedMethod::Level1 => &self.level1,
            ElevatedMethod::Level2 => &self.level2,
        }
    }

    fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(24))
    }

    // ------------------------------------------------------------------
    // Pure reads
    // ------------------------------------------------------------------

    /// Format check on the stored key: length above the platform minimum and
    /// alphanumeric/`_`/`-` charset. Deliberately no network call; true
    /// acceptance is only confirmed by [`Self::test_connection`] or the
    /// first real API call.
    pub fn is_api_key_valid(&self) -> bool {
        let key = self.config.api_key.trim();
        key.len() > 10
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    /// The API-key header every platform call must carry. Pure, infallible.
    pub fn auth_headers(&self) -> HashMap<String, String> {
        let (name, value) = self.config.key_header.header_pair(&self.config.api_key);
        HashMap::from([(name, value)])
    }

    /// Elevated-session parameters for a request body: the selected
    /// session's token under its method-specific key, or an empty map when
    /// no session is valid. When both sessions are valid only the preferred
    /// method's token is included, so downstream requests are unambiguous.
    pub fn auth_parameters(&self) -> Map<String, Value> {
        let mut params = Map::new();
        if let Some((method, session)) = self.selected_session(Utc::now()) {
            params.insert(method.token_param().to_string(), json!(session.token));
        }
        params
    }

    /// Raw token accessor for legacy callers.
    pub fn user_session(&self) -> Option<String> {
        self.selected_session(Utc::now()).map(|(_, s)| s.token)
    }

    /// The valid session the preference rule selects: preferred method if
    /// its slot is valid, otherwise the other slot if valid.
    fn selected_session(&self, now: DateTime<Utc>) -> Option<(ElevatedMethod, Session)> {
        let preferred = self.config.preferred_method;
        for method in [preferred, preferred.other()] {
            if let Some(session) = self.slot(method).valid_session(now) {
                return Some((method, session));
            }
        }
        None
    }

    /// Snapshot of the full authentication state, computed on demand.
    pub fn auth_status(&self) -> AuthStatus {
        let now = Utc::now();
        let api_key_valid = self.is_api_key_valid();
        let v1 = self.level1.valid_session(now).is_some();
        let v2 = self.level2.valid_session(now).is_some();

        let mut valid_levels = BTreeSet::new();
        if api_key_valid {
            valid_levels.insert(AuthLevel::ApiKey);
        }
        if v1 {
            valid_levels.insert(AuthLevel::SessionLevel1);
        }
        if v2 {
            valid_levels.insert(AuthLevel::SessionLevel2);
        }

        let current_level = self
            .selected_session(now)
            .map(|(method, _)| method.level())
            .unwrap_or(if api_key_valid {
                AuthLevel::ApiKey
            } else {
                AuthLevel::None
            });

        AuthStatus {
            api_key_valid,
            v1_session_valid: v1,
            v2_session_valid: v2,
            current_level,
            valid_levels,
            can_perform_user_actions: v1 || v2,
        }
    }

    /// Single effective level: the preferred method's level when that
    /// session is valid, else the highest-privilege valid level.
    pub fn current_auth_level(&self) -> AuthLevel {
        self.auth_status().current_level
    }

    pub fn valid_auth_levels(&self) -> BTreeSet<AuthLevel> {
        self.auth_status().valid_levels
    }

    // ------------------------------------------------------------------
    // Endpoint policy
    // ------------------------------------------------------------------

    /// Required level for an endpoint. Independent of session state.
    pub fn required_auth_level(&self, path: &str) -> AuthLevel {
        self.policy.required_level(path)
    }

    pub fn requires_user_session(&self, path: &str) -> bool {
        self.policy.requires_user_session(path)
    }

    /// Whether the manager can currently call `path`.
    pub fn can_access_endpoint(&self, path: &str) -> bool {
        if !self.is_api_key_valid() {
            return false;
        }
        let required = self.policy.required_level(path);
        required <= AuthLevel::ApiKey || self.current_auth_level() >= required
    }

    // ------------------------------------------------------------------
    // Login flows
    // ------------------------------------------------------------------

    /// Level-1 login: auth-session mechanism, optional TOTP.
    pub async fn login_level1(
        &self,
        credentials: &Level1Credentials,
    ) -> std::result::Result<SessionGrant, LoginError> {
        let mut payload = json!({
            "user_name": credentials.user_name,
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        if let Some(totp) = &credentials.totp_secret {
            payload["totp_secret"] = json!(totp.expose_secret());
        }
        if let Some(proxy) = &credentials.proxy {
            payload["proxy"] = json!(proxy);
        }
        self.login_slot(ElevatedMethod::Level1, LEVEL1_LOGIN_PATH, payload)
            .await
    }

    /// Level-2 login: login-cookie mechanism, no TOTP field.
    pub async fn login_level2(
        &self,
        credentials: &Level2Credentials,
    ) -> std::result::Result<SessionGrant, LoginError> {
        let mut payload = json!({
            "user_name": credentials.user_name,
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });
        if let Some(proxy) = &credentials.proxy {
            payload["proxy"] = json!(proxy);
        }
        self.login_slot(ElevatedMethod::Level2, LEVEL2_LOGIN_PATH, payload)
            .await
    }

    /// Shared login path. Holds the slot's single-flight guard across the
    /// network call; a caller that waited on the guard reuses the fresh
    /// session instead of logging in again. A failure of any kind leaves
    /// the slot exactly as it was.
    async fn login_slot(
        &self,
        method: ElevatedMethod,
        path: &str,
        payload: Value,
    ) -> std::result::Result<SessionGrant, LoginError> {
        let slot = self.slot(method);
        let _guard = slot.login_guard.lock().await;

        if let Some(session) = slot.valid_session(Utc::now()) {
            return Ok(SessionGrant {
                method,
                token: session.token,
                expires_at: session.expires_at,
            });
        }

        let response = self
            .transport
            .post_json(path, &self.auth_headers(), &payload)
            .await
            .map_err(|e| {
                warn!(method = %method, error = %e, "login transport failure");
                e
            })?;

        if !response.is_success() {
            let err = LoginError::Http {
                status: response.status,
                message: response.error_message(),
            };
            warn!(method = %method, status = response.status, "login rejected by platform");
            return Err(err);
        }

        let token = normalize_login_response(method, &response.body).map_err(|e| {
            warn!(method = %method, error = %e, "login response not usable");
            e
        })?;

        let expires_at = Utc::now() + self.session_ttl();
        *slot.state.write() = Some(Session {
            token: token.clone(),
            expires_at,
        });
        info!(method = %method, %expires_at, "login succeeded");

        Ok(SessionGrant {
            method,
            token,
            expires_at,
        })
    }

    /// Unified login over the configured credential bundles.
    ///
    /// Tries the preferred method first and falls back to the other only
    /// when the preferred bundle is absent; a rejected login of a present
    /// bundle is returned as-is. With no usable bundle at all the error
    /// names the missing environment inputs.
    pub async fn login(&self) -> std::result::Result<SessionGrant, LoginError> {
        let preferred = self.config.preferred_method;
        for method in [preferred, preferred.other()] {
            match method {
                ElevatedMethod::Level1 => {
                    if let Some(creds) = &self.config.level1 {
                        return self.login_level1(creds).await;
                    }
                }
                ElevatedMethod::Level2 => {
                    if let Some(creds) = &self.config.level2 {
                        return self.login_level2(creds).await;
                    }
                }
            }
        }

        let missing = CredentialPresence::from_config(&self.config).missing();
        Err(LoginError::MissingCredentials(format!(
            "no usable credential bundle; missing inputs: {}",
            missing.join(", ")
        )))
    }

    /// Idempotent upgrade helper: true immediately (no network call) when
    /// the current effective level already satisfies `required`, otherwise
    /// the success of the appropriate login attempt.
    pub async fn ensure_auth_level(&self, required: AuthLevel) -> bool {
        match required {
            AuthLevel::None => true,
            AuthLevel::ApiKey => self.is_api_key_valid(),
            _ => {
                if self.current_auth_level() >= required {
                    return true;
                }
                let attempt = if required == AuthLevel::SessionLevel2 {
                    // Only a level-2 session satisfies this; the unified
                    // login could stop at level 1.
                    match &self.config.level2 {
                        Some(creds) => self.login_level2(creds).await,
                        None => Err(LoginError::MissingCredentials(
                            "level-2 credentials not configured".to_string(),
                        )),
                    }
                } else {
                    self.login().await
                };
                match attempt {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(%required, error = %e, "could not reach required auth level");
                        false
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Extend a currently valid session by the configured window. Returns
    /// false (a no-op, not an error) when there is nothing to refresh. The
    /// new expiry is strictly later than the old one.
    pub fn refresh_session(&self, method: ElevatedMethod) -> bool {
        let slot = self.slot(method);
        let now = Utc::now();
        let mut state = slot.state.write();
        match state.as_mut() {
            Some(session) if session.is_valid_at(now) => {
                let extended = now + self.session_ttl();
                session.expires_at =
                    extended.max(session.expires_at + chrono::Duration::milliseconds(1));
                info!(method = %method, expires_at = %session.expires_at, "session refreshed");
                true
            }
            _ => false,
        }
    }

    /// Clear one or both session slots. Idempotent; never fails.
    pub fn logout(&self, method: Option<ElevatedMethod>) {
        match method {
            Some(m) => {
                *self.slot(m).state.write() = None;
                info!(method = %m, "session cleared");
            }
            None => {
                *self.level1.state.write() = None;
                *self.level2.state.write() = None;
                info!("all sessions cleared");
            }
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Confirm the platform actually accepts the API key by hitting a cheap
    /// read endpoint. `Ok(false)` means the platform answered and said no
    /// (401/403); other failures surface as errors.
    pub async fn test_connection(&self) -> std::result::Result<bool, LoginError> {
        let response = self
            .transport
            .get(CONNECTION_TEST_PATH, &self.auth_headers())
            .await?;
        match response.status {
            status if (200..300).contains(&status) => Ok(true),
            401 | 403 => Ok(false),
            status => Err(LoginError::Http {
                status,
                message: response.error_message(),
            }),
        }
    }

    /// Introspection snapshot for operators. Secrets appear masked only.
    pub fn debug_info(&self) -> DebugInfo {
        let now = Utc::now();
        let status = self.auth_status();
        let session_debug = |slot: &SessionSlot| {
            let state = slot.state.read();
            SessionDebug {
                valid: state.as_ref().map(|s| s.is_valid_at(now)).unwrap_or(false),
                expires_in_secs: state
                    .as_ref()
                    .filter(|s| s.is_valid_at(now))
                    .map(|s| s.seconds_until_expiry(now)),
            }
        };

        DebugInfo {
            version: DEBUG_INFO_VERSION,
            current_level: status.current_level,
            preferred_method: self.config.preferred_method,
            key_header: self.config.key_header,
            api_key_preview: crate::diagnostics::mask_secret(&self.config.api_key),
            api_key_valid: status.api_key_valid,
            level1_session: session_debug(&self.level1),
            level2_session: session_debug(&self.level2),
            credentials: CredentialPresence::from_config(&self.config),
        }
    }

    /// Test-only handle for planting session state directly.
    #[cfg(test)]
    pub(crate) fn set_session(&self, method: ElevatedMethod, session: Option<Session>) {
        *self.slot(method).state.write() = session;
    }
}
