//! Refresh-token verification and rotation
//!
//! A presented access token is only a carrier for issuer, audience, subject and
//! `jti`; trust comes from the stored refresh-token row it is bound to. Checks run
//! in a fixed order and the first failure decides the rejection reason.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::core::auth::error::AuthError;
use crate::core::auth::issuer::{TokenIssuer, TokenPair};
use crate::core::db::{IdentityStore, TokenStore};

/// Validates a presented token pair and rotates it
#[derive(Clone)]
pub struct TokenRotator {
    issuer: TokenIssuer,
    identity: Arc<dyn IdentityStore>,
    tokens: Arc<dyn TokenStore>,
}

impl TokenRotator {
    pub fn new(
        issuer: TokenIssuer,
        identity: Arc<dyn IdentityStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            issuer,
            identity,
            tokens,
        }
    }

    /// Exchange an access token and its refresh token for a new pair.
    ///
    /// `claimed_user_id` is the caller-supplied user id; it must match the user
    /// the access token's subject resolves to.
    pub async fn refresh_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        claimed_user_id: &str,
    ) -> Result<TokenPair, AuthError> {
        let config = self.issuer.jwt().config();

        let claims = self
            .issuer
            .jwt()
            .decode_for_refresh(access_token)
            .map_err(|e| {
                tracing::debug!("Refresh rejected, access token unreadable: {}", e);
                AuthError::InvalidToken
            })?;

        if claims.iss != config.issuer {
            tracing::debug!("Refresh rejected, issuer mismatch: {}", claims.iss);
            return Err(AuthError::InvalidToken);
        }

        if !claims.aud.contains(&config.audience) {
            tracing::debug!("Refresh rejected, audience mismatch");
            return Err(AuthError::InvalidToken);
        }

        let user = self
            .identity
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if Uuid::parse_str(claimed_user_id.trim()).ok() != Some(user.id) {
            tracing::debug!("Refresh rejected, subject does not match claimed user id");
            return Err(AuthError::InvalidToken);
        }

        let stored = self
            .tokens
            .find_by_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if stored.jwt_id != claims.jti {
            tracing::warn!(
                "Refresh token for user {} presented with a foreign access token",
                stored.user_id
            );
            return Err(AuthError::InvalidRefreshToken);
        }

        if stored.is_expired_at(Utc::now()) {
            return Err(AuthError::RefreshTokenExpired);
        }

        let pair = self.issuer.issue_token_pair(&user).await?;

        tracing::info!("Rotated refresh token for user {}", user.id);

        Ok(pair)
    }
}
