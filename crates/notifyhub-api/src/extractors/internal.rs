//! `InternalCaller` extractor for service-to-service routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use notifyhub_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Proof that the request carried the configured internal API key.
///
/// With no key configured every internal route is refused.
#[derive(Debug, Clone, Copy)]
pub struct InternalCaller;

impl FromRequestParts<AppState> for InternalCaller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state.config.auth.internal_api_key.as_str();
        if expected.is_empty() {
            return Err(AppError::service_unavailable("Internal API is disabled").into());
        }

        let presented = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing API key"))?;

        if presented != expected {
            tracing::warn!("Internal API call with an invalid key");
            return Err(AppError::authentication("Invalid API key").into());
        }

        Ok(InternalCaller)
    }
}
