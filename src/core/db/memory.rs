//! In-memory store implementations
//!
//! DashMap-backed identity and token stores. Used by the test suites and by
//! debug builds started without `DATABASE_URL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::db::models::{CreateUser, RefreshToken, Role, User, UserClaim};
use crate::core::db::store::{
    BCRYPT_COST, IdentityStore, StoreError, StoreResult, TokenStore, check_password_policy,
    duplicate_email, hash_password, normalize_email, verify_password,
};

// ============================================================================
// Identity Store
// ============================================================================

/// In-memory identity store
#[derive(Clone)]
pub struct MemoryIdentityStore {
    users: Arc<DashMap<Uuid, User>>,
    by_email: Arc<DashMap<String, Uuid>>,
    roles: Arc<DashMap<Uuid, Vec<Role>>>,
    claims: Arc<DashMap<Uuid, Vec<UserClaim>>>,
    bcrypt_cost: u32,
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self {
            users: Arc::default(),
            by_email: Arc::default(),
            roles: Arc::default(),
            claims: Arc::default(),
            bcrypt_cost: BCRYPT_COST,
        }
    }
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bcrypt cost (tests use the minimum of 4)
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Number of registered users
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn create_user(&self, dto: CreateUser) -> StoreResult<User> {
        check_password_policy(&dto.password)?;

        let email_key = normalize_email(&dto.email);
        if self.by_email.contains_key(&email_key) {
            return Err(duplicate_email(&dto.email));
        }

        let password_hash = hash_password(&dto.password, self.bcrypt_cost).await?;
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: dto.email,
            first_name: dto.first_name,
            last_name: dto.last_name,
            password_hash,
            created_at: now,
            updated_at: now,
        };

        // Reserve the email atomically; a concurrent registration may have won the race
        match self.by_email.entry(email_key) {
            Entry::Occupied(_) => return Err(duplicate_email(&user.email)),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }
        self.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn add_to_role(&self, user_id: Uuid, role: Role) -> StoreResult<()> {
        if !self.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound);
        }

        let mut roles = self.roles.entry(user_id).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .by_email
            .get(&normalize_email(email))
            .and_then(|id| self.users.get(id.value()).map(|r| r.value().clone())))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|r| r.value().clone()))
    }

    async fn check_password(&self, user: &User, password: &str) -> StoreResult<bool> {
        verify_password(password, &user.password_hash).await
    }

    async fn roles(&self, user_id: Uuid) -> StoreResult<Vec<Role>> {
        Ok(self
            .roles
            .get(&user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn claims(&self, user_id: Uuid) -> StoreResult<Vec<UserClaim>> {
        Ok(self
            .claims
            .get(&user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn add_claim(&self, user_id: Uuid, claim: UserClaim) -> StoreResult<()> {
        if !self.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound);
        }

        self.claims.entry(user_id).or_default().push(claim);
        Ok(())
    }

    async fn update_details(
        &self,
        user_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<User> {
        let mut user = self
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound)?;

        user.first_name = first_name.to_string();
        user.last_name = last_name.to_string();
        user.updated_at = Utc::now();

        Ok(user.value().clone())
    }
}

// ============================================================================
// Token Store
// ============================================================================

/// In-memory refresh token store.
///
/// Rows are keyed by user id, so a user can never hold two rows. Lookup by
/// token value scans the map.
#[derive(Default, Clone)]
pub struct MemoryTokenStore {
    rows: Arc<DashMap<Uuid, RefreshToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or overwrite a row directly, bypassing issuance
    pub fn insert_row(&self, row: RefreshToken) {
        self.rows.insert(row.user_id, row);
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find_by_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.value().token == token)
            .map(|r| r.value().clone()))
    }

    async fn find_by_user_id(&self, user_id: Uuid) -> StoreResult<Option<RefreshToken>> {
        Ok(self.rows.get(&user_id).map(|r| r.value().clone()))
    }

    async fn replace_for_user(&self, token: RefreshToken) -> StoreResult<()> {
        self.rows.insert(token.user_id, token);
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: Uuid) -> StoreResult<bool> {
        Ok(self.rows.remove(&user_id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let before = self.rows.len();
        self.rows.retain(|_, row| !row.is_expired_at(now));
        Ok(before.saturating_sub(self.rows.len()) as u64)
    }
}
