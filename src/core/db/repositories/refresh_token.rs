//! Refresh token repository
//!
//! Stores the single refresh-token row each user may hold. Replacement is an
//! upsert keyed on `user_id`, so concurrent issuance for one user resolves to
//! whichever statement commits last.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::RefreshToken;
use crate::core::db::store::{StoreResult, TokenStore};

/// Refresh token repository for database operations
#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: PgPool,
}

impl RefreshTokenRepository {
    /// Create a new refresh token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for RefreshTokenRepository {
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, jwt_id, user_id, added_date, expire_date
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> StoreResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, jwt_id, user_id, added_date, expire_date
            FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn replace_for_user(&self, token: RefreshToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, jwt_id, user_id, added_date, expire_date)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE
            SET token = EXCLUDED.token,
                jwt_id = EXCLUDED.jwt_id,
                added_date = EXCLUDED.added_date,
                expire_date = EXCLUDED.expire_date
            "#,
        )
        .bind(&token.token)
        .bind(&token.jwt_id)
        .bind(token.user_id)
        .bind(token.added_date)
        .bind(token.expire_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expire_date < $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
