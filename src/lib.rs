//! Twittercast - tiered authentication core for platform API clients
//!
//! This library tracks three progressively privileged credential types
//! (API key plus two independent elevated session mechanisms), resolves a
//! single effective authorization level, decides per endpoint which level
//! is required, and exposes the header/parameter contract that downstream
//! platform calls consume.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod manager;
pub mod policy;
pub mod response;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use config::{AuthConfig, KeyHeaderStyle, TransportConfig};
pub use error::{ConfigError, LoginError, Result, TwittercastError};
pub use manager::AuthManager;
pub use policy::EndpointPolicy;
pub use types::{
    AuthLevel, AuthStatus, ElevatedMethod, Level1Credentials, Level2Credentials, Session,
    SessionGrant,
};
