//! Store traits
//!
//! Async interfaces over the identity subsystem (accounts, passwords, roles,
//! claims) and the refresh-token table. The auth layer depends only on these
//! traits; PostgreSQL and in-memory implementations live alongside.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::db::models::{CreateUser, RefreshToken, Role, User, UserClaim};

/// Minimum password length accepted by the identity store
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Cost factor for bcrypt hashing (12 is recommended for production)
pub const BCRYPT_COST: u32 = 12;

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The identity store refused the operation; messages are user-facing
    #[error("{}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("User not found")]
    UserNotFound,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Password policy enforced on account creation
pub fn check_password_policy(password: &str) -> StoreResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(StoreError::Rejected(vec![format!(
            "Passwords must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        )]));
    }
    Ok(())
}

/// Hash a password using bcrypt with automatic salt generation.
///
/// Runs on the blocking pool so request workers are not stalled.
pub async fn hash_password(password: &str, cost: u32) -> StoreResult<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| StoreError::Hashing(e.to_string()))?
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Verify a password against a bcrypt hash on the blocking pool
pub async fn verify_password(password: &str, hash: &str) -> StoreResult<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| StoreError::Hashing(e.to_string()))?
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Lookup key for an email address. Emails compare case-insensitively; the
/// address as entered is what gets stored and displayed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn duplicate_email(email: &str) -> StoreError {
    StoreError::Rejected(vec![format!("Email '{}' is already taken.", email)])
}

/// Identity store: user accounts, password verification, roles and custom claims
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Create a user, hashing the password. Rejects duplicate emails and short passwords.
    async fn create_user(&self, user: CreateUser) -> StoreResult<User>;

    /// Assign a role to a user (no-op if already held)
    async fn add_to_role(&self, user_id: Uuid, role: Role) -> StoreResult<()>;

    /// Find a user by email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Verify a plain text password against the user's stored hash
    async fn check_password(&self, user: &User, password: &str) -> StoreResult<bool>;

    /// Roles held by the user, in assignment order
    async fn roles(&self, user_id: Uuid) -> StoreResult<Vec<Role>>;

    /// Custom claims stored for the user, in insertion order
    async fn claims(&self, user_id: Uuid) -> StoreResult<Vec<UserClaim>>;

    /// Attach a custom claim to the user
    async fn add_claim(&self, user_id: Uuid, claim: UserClaim) -> StoreResult<()>;

    /// Update first and last name
    async fn update_details(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<User>;
}

/// Token store: refresh-token rows, at most one per user
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Find a row by its token value
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshToken>>;

    /// Find the row owned by a user
    async fn find_by_user_id(&self, user_id: Uuid) -> StoreResult<Option<RefreshToken>>;

    /// Replace whatever row the user holds with `token`. Last writer wins.
    async fn replace_for_user(&self, token: RefreshToken) -> StoreResult<()>;

    /// Delete the row owned by a user. Returns whether a row existed.
    async fn delete_by_user_id(&self, user_id: Uuid) -> StoreResult<bool>;

    /// Delete rows whose expiry is before `now`
    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}
