//! User repository for database operations
//!
//! PostgreSQL-backed identity store: accounts with bcrypt password hashes,
//! role assignments and custom claims.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{CreateUser, Role, User, UserClaim};
use crate::core::db::store::{
    BCRYPT_COST, IdentityStore, StoreError, StoreResult, check_password_policy, duplicate_email,
    hash_password, verify_password,
};

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete a user by ID (roles, claims and refresh token cascade)
    pub async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl IdentityStore for UserRepository {
    async fn create_user(&self, dto: CreateUser) -> StoreResult<User> {
        check_password_policy(&dto.password)?;

        if self.find_by_email(&dto.email).await?.is_some() {
            return Err(duplicate_email(&dto.email));
        }

        let password_hash = hash_password(&dto.password, BCRYPT_COST).await?;

        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, first_name, last_name, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, first_name, last_name, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&password_hash)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            // Concurrent registration with the same email
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(duplicate_email(&dto.email))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn add_to_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, created_at, updated_at
            FROM users
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn check_password(&self, user: &User, password: &str) -> StoreResult<bool> {
        verify_password(password, &user.password_hash).await
    }

    async fn roles(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT role
            FROM user_roles
            WHERE user_id = $1
            ORDER BY assigned_at, role
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            match name.parse::<Role>() {
                Ok(role) => roles.push(role),
                Err(e) => tracing::warn!("Skipping role row for user {}: {}", user_id, e),
            }
        }
        Ok(roles)
    }

    async fn claims(&self, user_id: Uuid) -> StoreResult<Vec<UserClaim>> {
        let claims = sqlx::query_as::<_, UserClaim>(
            r#"
            SELECT claim_type, claim_value
            FROM user_claims
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(claims)
    }

    async fn add_claim(&self, user_id: Uuid, claim: UserClaim) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_claims (user_id, claim_type, claim_value)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&claim.claim_type)
        .bind(&claim.claim_value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_details(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, first_name, last_name, password_hash, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::UserNotFound)
    }
}
