//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// Credentials used to verify callers.
///
/// End users authenticate with an HS256 JWT issued by the platform's
/// session service; upstream business services use a shared API key on
/// the internal routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Clock skew tolerated when checking `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub jwt_leeway_seconds: u64,
    /// Shared key expected in the `x-api-key` header on internal routes.
    #[serde(default = "default_internal_api_key")]
    pub internal_api_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            jwt_leeway_seconds: default_leeway(),
            internal_api_key: default_internal_api_key(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_leeway() -> u64 {
    30
}

fn default_internal_api_key() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}
