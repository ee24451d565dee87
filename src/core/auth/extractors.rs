//! Request extractors for authenticated endpoints
//!
//! The bearer token is validated in full: signature, expiry, issuer and audience.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::core::auth::api::AuthApiState;
use crate::core::auth::error::AuthError;

/// Caller identity taken from a valid access token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl FromRequestParts<Arc<AuthApiState>> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AuthApiState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::Unauthenticated)?;

        let claims = state
            .auth_service
            .jwt()
            .validate_token(bearer.token())
            .map_err(|e| {
                tracing::debug!("Bearer token rejected: {}", e);
                AuthError::Unauthenticated
            })?;

        let user_id = claims.user_id().map_err(|_| AuthError::Unauthenticated)?;

        Ok(Self { user_id })
    }
}
