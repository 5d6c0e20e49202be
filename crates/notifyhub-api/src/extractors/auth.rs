//! `AuthUser` extractor: pulls the JWT from the Authorization header and
//! resolves the calling user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use notifyhub_core::error::AppError;
use notifyhub_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated end user of a request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserId);

impl std::ops::Deref for AuthUser {
    type Target = UserId;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let claims = state.authenticator.verify(token.trim())?;
        let user_id = UserId::new(claims.sub);
        if user_id.is_blank() {
            return Err(AppError::authentication("Token has no subject").into());
        }

        Ok(AuthUser(user_id))
    }
}
