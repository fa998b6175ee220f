//! Static endpoint-to-auth-level policy
//!
//! The policy is pure data: the required level for a path never depends on
//! the manager's current session state, and lookups have no side effects.

use crate::types::AuthLevel;

/// A single policy rule. Exact rules are consulted before prefix rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub pattern: PathPattern,
    pub level: AuthLevel,
}

/// Mapping from endpoint path to the minimum auth level required to call it.
///
/// Paths not covered by any rule resolve to [`AuthLevel::ApiKey`], the
/// platform's read default.
#[derive(Debug, Clone)]
pub struct EndpointPolicy {
    rules: Vec<PolicyRule>,
}

/// Write-path endpoints that act as the logged-in user. Any valid elevated
/// session satisfies them, so they require the lower session level. Each
/// entry is registered both bare and under the `/twitter` mount, since
/// callers use both spellings.
const USER_ACTION_PREFIXES: &[&str] = &[
    "/tweet/create",
    "/tweet/delete",
    "/tweet/reply",
    "/tweet/retweet",
    "/tweet/unretweet",
    "/tweet/like",
    "/tweet/unlike",
    "/tweet/bookmark",
    "/tweet/upload_image",
    "/user/follow",
    "/user/unfollow",
    "/dm/",
];

impl Default for EndpointPolicy {
    fn default() -> Self {
        let mut rules = Vec::new();
        for prefix in USER_ACTION_PREFIXES {
            for mounted in [prefix.to_string(), format!("/twitter{}", prefix)] {
                rules.push(PolicyRule {
                    pattern: PathPattern::Prefix(mounted),
                    level: AuthLevel::SessionLevel1,
                });
            }
        }
        Self::new(rules)
    }
}

impl EndpointPolicy {
    /// Policy from an explicit rule list; exact rules take precedence over
    /// prefix rules regardless of insertion order.
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// Minimum level required to call `path`. Total and pure.
    pub fn required_level(&self, path: &str) -> AuthLevel {
        let path = normalize_path(path);

        for rule in &self.rules {
            if let PathPattern::Exact(p) = &rule.pattern {
                if path == p {
                    return rule.level;
                }
            }
        }
        for rule in &self.rules {
            if let PathPattern::Prefix(p) = &rule.pattern {
                if path.starts_with(p.as_str()) {
                    return rule.level;
                }
            }
        }
        AuthLevel::ApiKey
    }

    /// Whether the endpoint needs an elevated session, not just the key.
    pub fn requires_user_session(&self, path: &str) -> bool {
        self.required_level(path) > AuthLevel::ApiKey
    }
}

/// Strip any query string and a trailing slash before matching.
fn normalize_path(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
