//! Handshake authentication — validates the JWT presented with `userId`.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use notifyhub_core::config::auth::AuthConfig;
use notifyhub_core::error::{AppError, ErrorKind};
use notifyhub_core::result::AppResult;
use notifyhub_core::types::UserId;

/// Claims carried by platform access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: String,
    /// Expiry (unix seconds).
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Verifies HS256 tokens issued by the platform's session service.
#[derive(Clone)]
pub struct HandshakeAuthenticator {
    decoding_key: DecodingKey,
    encoding_key: EncodingKey,
    validation: Validation,
}

impl std::fmt::Debug for HandshakeAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeAuthenticator").finish()
    }
}

impl HandshakeAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.jwt_leeway_seconds;
        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token.
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                AppError::with_source(ErrorKind::Authentication, "Invalid or expired token", e)
            })
    }

    /// Authenticates a handshake carrying `userId` and `token`.
    ///
    /// Both must be present and the token subject must be the user.
    pub fn authenticate(&self, user_id: Option<&str>, token: Option<&str>) -> AppResult<UserId> {
        let user_id = user_id.map(str::trim).filter(|id| !id.is_empty());
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        let (Some(user_id), Some(token)) = (user_id, token) else {
            return Err(AppError::authentication("Authentication required"));
        };

        let claims = self.verify(token)?;
        if claims.sub != user_id {
            return Err(AppError::authentication("Token was not issued to this user"));
        }
        Ok(UserId::new(user_id))
    }

    /// Issues a token for `user_id`, valid for `ttl`.
    pub fn issue(&self, user_id: &UserId, ttl: chrono::Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + ttl).timestamp(),
            iat: Some(now.timestamp()),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::with_source(ErrorKind::Internal, "Failed to sign token", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator(secret: &str) -> HandshakeAuthenticator {
        HandshakeAuthenticator::new(&AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_leeway_seconds: 0,
            ..AuthConfig::default()
        })
    }

    #[test]
    fn test_valid_handshake() {
        let auth = authenticator("s3cret");
        let token = auth
            .issue(&UserId::from("aff-7"), chrono::Duration::minutes(5))
            .unwrap();
        let user = auth.authenticate(Some("aff-7"), Some(&token)).unwrap();
        assert_eq!(user.as_str(), "aff-7");
    }

    #[test]
    fn test_missing_credentials() {
        let auth = authenticator("s3cret");
        let err = auth.authenticate(Some("aff-7"), None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert_eq!(err.message, "Authentication required");
        assert!(auth.authenticate(None, Some("token")).is_err());
        assert!(auth.authenticate(Some(" "), Some("token")).is_err());
    }

    #[test]
    fn test_subject_mismatch_and_bad_signature() {
        let auth = authenticator("s3cret");
        let token = auth
            .issue(&UserId::from("aff-7"), chrono::Duration::minutes(5))
            .unwrap();
        assert!(auth.authenticate(Some("aff-8"), Some(&token)).is_err());

        let other = authenticator("different");
        assert!(other.authenticate(Some("aff-7"), Some(&token)).is_err());
    }

    #[test]
    fn test_expired_token() {
        let auth = authenticator("s3cret");
        let token = auth
            .issue(&UserId::from("aff-7"), chrono::Duration::minutes(-10))
            .unwrap();
        assert!(auth.verify(&token).is_err());
    }
}
