//! Authentication service
//!
//! Provides business logic for registration, login, token refresh, logout and
//! profile updates. Coordinates the identity store, the token store, the token
//! issuer and the rotator.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::core::auth::error::AuthError;
use crate::core::auth::issuer::{TokenIssuer, TokenPair};
use crate::core::auth::jwt::JwtService;
use crate::core::auth::rotation::TokenRotator;
use crate::core::db::{CreateUser, IdentityStore, Role, TokenStore, UserResponse};
use crate::core::validation::{PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, Validate, Validator};

/// Registration request data
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.email("Email", &self.email);
        v.length_between(
            "Password",
            &self.password,
            PASSWORD_MIN_LENGTH,
            PASSWORD_MAX_LENGTH,
        );
        v.required("FirstName", &self.first_name);
        v.required("LastName", &self.last_name);
        v.finish()
    }
}

/// Login request data
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.email("Email", &self.email);
        v.required("Password", &self.password);
        v.finish()
    }
}

/// Token refresh request: the expiring pair plus the user it belongs to
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenRequest {
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
}

/// Profile update request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserDetailsRequest {
    pub first_name: String,
    pub last_name: String,
}

impl Validate for UpdateUserDetailsRequest {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut v = Validator::new();
        v.required("FirstName", &self.first_name);
        v.required("LastName", &self.last_name);
        v.finish()
    }
}

/// Proof that a caller may create an administrator account
#[derive(Debug, Clone)]
pub enum AdminGrant {
    /// Shared invite secret presented by the caller
    Invite(String),
    /// Authenticated caller; must currently hold the Administrator role
    Caller(Uuid),
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityStore>,
    tokens: Arc<dyn TokenStore>,
    issuer: TokenIssuer,
    rotator: TokenRotator,
    admin_invite_digest: Option<[u8; 32]>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        jwt: JwtService,
        identity: Arc<dyn IdentityStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let issuer = TokenIssuer::new(jwt, identity.clone(), tokens.clone());
        let rotator = TokenRotator::new(issuer.clone(), identity.clone(), tokens.clone());

        Self {
            identity,
            tokens,
            issuer,
            rotator,
            admin_invite_digest: None,
        }
    }

    /// Enable invite-based admin registration. `None` or an empty secret disables it.
    pub fn admin_invite_secret(mut self, secret: Option<String>) -> Self {
        self.admin_invite_digest = secret.filter(|s| !s.is_empty()).map(|s| digest(&s));
        self
    }

    pub fn jwt(&self) -> &JwtService {
        self.issuer.jwt()
    }

    /// Register a new customer
    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthError> {
        request.validate().map_err(AuthError::Validation)?;
        self.create_with_role(request, Role::Customer).await
    }

    /// Register a new administrator. Requires an invite secret or an administrator caller.
    pub async fn register_admin(
        &self,
        request: RegisterRequest,
        grant: AdminGrant,
    ) -> Result<UserResponse, AuthError> {
        request.validate().map_err(AuthError::Validation)?;
        self.authorize_admin_grant(&grant).await?;
        self.create_with_role(request, Role::Administrator).await
    }

    async fn authorize_admin_grant(&self, grant: &AdminGrant) -> Result<(), AuthError> {
        match grant {
            AdminGrant::Invite(secret) => match self.admin_invite_digest {
                Some(expected) if digest(secret) == expected => Ok(()),
                Some(_) => Err(AuthError::Authorization("Invalid Secret Key".to_string())),
                None => {
                    tracing::warn!("Admin invite presented but ADMIN_INVITE_SECRET is not set");
                    Err(AuthError::Authorization("Invalid Secret Key".to_string()))
                }
            },
            AdminGrant::Caller(caller_id) => {
                if self.is_administrator(*caller_id).await? {
                    Ok(())
                } else {
                    Err(AuthError::Authorization(
                        "Administrator role required".to_string(),
                    ))
                }
            }
        }
    }

    async fn create_with_role(
        &self,
        request: RegisterRequest,
        role: Role,
    ) -> Result<UserResponse, AuthError> {
        let user = self
            .identity
            .create_user(CreateUser {
                email: request.email.trim().to_string(),
                password: request.password,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
            })
            .await?;

        self.identity.add_to_role(user.id, role).await?;

        tracing::info!("Created user {} with role {}", user.id, role);

        Ok(user.into())
    }

    /// Whether the user currently holds the Administrator role
    pub async fn is_administrator(&self, user_id: Uuid) -> Result<bool, AuthError> {
        let roles = self.identity.roles(user_id).await?;
        Ok(roles.contains(&Role::Administrator))
    }

    /// Login an existing user.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPair, AuthError> {
        request.validate().map_err(AuthError::Validation)?;

        let user = self
            .identity
            .find_by_email(request.email.trim())
            .await?
            .ok_or(AuthError::InvalidAuthentication)?;

        if !self.identity.check_password(&user, &request.password).await? {
            return Err(AuthError::InvalidAuthentication);
        }

        self.issuer.issue_token_pair(&user).await
    }

    /// Exchange an access token and its bound refresh token for a new pair
    pub async fn refresh_session(&self, request: TokenRequest) -> Result<TokenPair, AuthError> {
        self.rotator
            .refresh_session(&request.token, &request.refresh_token, &request.user_id)
            .await
    }

    /// Delete the user's refresh token. Always succeeds for a reachable store.
    pub async fn logout(&self, user_id: Uuid) -> Result<bool, AuthError> {
        let existed = self.tokens.delete_by_user_id(user_id).await?;
        tracing::debug!("Logout for user {} (row existed: {})", user_id, existed);
        Ok(true)
    }

    /// Update first and last name
    pub async fn update_user_details(
        &self,
        user_id: Uuid,
        request: UpdateUserDetailsRequest,
    ) -> Result<UserResponse, AuthError> {
        request.validate().map_err(AuthError::Validation)?;

        let user = self
            .identity
            .update_details(
                user_id,
                request.first_name.trim(),
                request.last_name.trim(),
            )
            .await?;

        Ok(user.into())
    }

    /// Remove refresh-token rows that have already expired
    pub async fn delete_expired_refresh_tokens(&self) -> Result<u64, AuthError> {
        let removed = self.tokens.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::info!("Removed {} expired refresh tokens", removed);
        }
        Ok(removed)
    }
}
