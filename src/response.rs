//! Login-response normalization
//!
//! The platform's login endpoints have drifted across versions and return a
//! handful of body shapes. Instead of probing properties ad hoc, the body is
//! classified into one of an ordered list of recognized shapes and handled
//! with a single match; anything else is an explicit unknown-shape error.

use serde::Deserialize;
use serde_json::Value;

use crate::error::LoginError;
use crate::types::ElevatedMethod;

/// Fields a login body may carry, at whatever nesting level it sits.
#[derive(Debug, Clone, Default, Deserialize)]
struct LoginFields {
    success: Option<bool>,
    status: Option<String>,
    session_token: Option<String>,
    auth_session: Option<String>,
    session: Option<String>,
    login_cookie: Option<String>,
    login_cookies: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

/// The recognized response shapes, in the order they are tried.
#[derive(Debug)]
enum LoginResponseShape {
    /// `{ "data": { success, <token field>, ... } }`
    Nested(LoginFields),
    /// `{ success, <token field>, ... }` at the top level
    Flat(LoginFields),
    Unknown,
}

fn classify(body: &Value) -> LoginResponseShape {
    if let Some(data) = body.get("data") {
        if data.is_object() {
            if let Ok(fields) = serde_json::from_value::<LoginFields>(data.clone()) {
                return LoginResponseShape::Nested(fields);
            }
        }
    }
    if body.is_object() {
        if let Ok(fields) = serde_json::from_value::<LoginFields>(body.clone()) {
            // A bare `{}` carries no signal; treat it as unrecognized.
            if fields.success.is_some()
                || fields.status.is_some()
                || fields.error.is_some()
                || token_for(&fields, ElevatedMethod::Level1).is_some()
                || token_for(&fields, ElevatedMethod::Level2).is_some()
            {
                return LoginResponseShape::Flat(fields);
            }
        }
    }
    LoginResponseShape::Unknown
}

fn token_for(fields: &LoginFields, method: ElevatedMethod) -> Option<String> {
    let candidates = match method {
        ElevatedMethod::Level1 => [
            fields.session_token.as_ref(),
            fields.auth_session.as_ref(),
            fields.session.as_ref(),
        ],
        ElevatedMethod::Level2 => [
            fields.login_cookie.as_ref(),
            fields.login_cookies.as_ref(),
            None,
        ],
    };
    candidates
        .into_iter()
        .flatten()
        .find(|t| !t.is_empty())
        .cloned()
}

fn rejection_message(fields: &LoginFields) -> String {
    fields
        .message
        .clone()
        .or_else(|| fields.msg.clone())
        .or_else(|| fields.error.clone())
        .unwrap_or_else(|| "login rejected by platform".to_string())
}

fn succeeded(fields: &LoginFields) -> bool {
    match (fields.success, fields.status.as_deref()) {
        (Some(flag), _) => flag,
        (None, Some(status)) => status.eq_ignore_ascii_case("success"),
        // No explicit flag at all: a present token is the success signal.
        (None, None) => true,
    }
}

/// Extract the session token for `method` from a 2xx login response body.
///
/// # Errors
///
/// - [`LoginError::Rejected`] when the body reports failure.
/// - [`LoginError::MalformedResponse`] when the shape is unrecognized, or a
///   success body is missing its token field.
pub fn normalize_login_response(
    method: ElevatedMethod,
    body: &Value,
) -> Result<String, LoginError> {
    let fields = match classify(body) {
        LoginResponseShape::Nested(fields) => fields,
        LoginResponseShape::Flat(fields) => fields,
        LoginResponseShape::Unknown => {
            return Err(LoginError::MalformedResponse(
                "unrecognized response shape".to_string(),
            ))
        }
    };

    if !succeeded(&fields) {
        return Err(LoginError::Rejected(rejection_message(&fields)));
    }

    token_for(&fields, method).ok_or_else(|| {
        LoginError::MalformedResponse(format!(
            "success response missing '{}' token",
            method.token_param()
        ))
    })
}
