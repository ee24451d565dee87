//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /auth/register - Register a customer
//! - POST /auth/register-admin/{invite_key} - Register an administrator with an invite
//! - POST /auth/register-admin - Register an administrator as an administrator
//! - POST /auth/login - Login and get a token pair
//! - POST /auth/generate-token - Rotate a token pair
//! - POST /auth/logout - Drop the caller's refresh token
//! - POST /auth/update-user-details - Change the caller's names
//! - GET /health - Liveness probe

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::auth::error::AuthError;
use crate::core::auth::extractors::AuthenticatedUser;
use crate::core::auth::issuer::TokenPair;
use crate::core::auth::service::{
    AdminGrant, AuthService, LoginRequest, RegisterRequest, TokenRequest,
    UpdateUserDetailsRequest,
};
use crate::core::db::UserResponse;

/// Auth API state containing the auth service
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

fn status_for(err: &AuthError) -> StatusCode {
    match err {
        AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        e if e.is_server_fault() => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn code_for(err: &AuthError) -> &'static str {
    match err {
        AuthError::Validation(_) => "VALIDATION_FAILED",
        AuthError::IdentityCreation(_) => "IDENTITY_REJECTED",
        AuthError::InvalidAuthentication => "INVALID_AUTHENTICATION",
        AuthError::InvalidToken => "INVALID_TOKEN",
        AuthError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
        AuthError::RefreshTokenExpired => "REFRESH_TOKEN_EXPIRED",
        AuthError::Authorization(_) => "FORBIDDEN",
        AuthError::UserNotFound => "USER_NOT_FOUND",
        AuthError::Unauthenticated => "UNAUTHENTICATED",
        AuthError::StoreFailure(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
    }
}

fn log_if_fault(err: &AuthError) {
    if err.is_server_fault() {
        tracing::error!("Auth request failed: {}", err);
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        log_if_fault(&self);
        let error = self.messages().join("; ");
        let body = ApiError::new(error, code_for(&self));
        (status_for(&self), Json(body)).into_response()
    }
}

/// Unreadable or mistyped request bodies are validation failures
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(vec![rejection.body_text()])
    }
}

/// Envelope for registration results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub is_success: bool,
    pub message: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

impl From<UserResponse> for RegisterResponse {
    fn from(user: UserResponse) -> Self {
        Self {
            is_success: true,
            message: vec!["User created successfully!".to_string()],
            user: Some(user),
        }
    }
}

/// Registration failure rendered as a [`RegisterResponse`]
pub struct RegisterRejection(AuthError);

impl From<AuthError> for RegisterRejection {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for RegisterRejection {
    fn from(rejection: JsonRejection) -> Self {
        Self(rejection.into())
    }
}

impl IntoResponse for RegisterRejection {
    fn into_response(self) -> Response {
        log_if_fault(&self.0);
        let body = RegisterResponse {
            is_success: false,
            message: self.0.messages(),
            user: None,
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Envelope for login and token rotation results
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub result: bool,
    pub errors: Vec<String>,
}

impl From<TokenPair> for LoginResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            user_id: Some(pair.user_id),
            token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
            result: true,
            errors: Vec::new(),
        }
    }
}

/// Login or rotation failure rendered as a [`LoginResponse`]
pub struct TokenRejection(AuthError);

impl From<AuthError> for TokenRejection {
    fn from(err: AuthError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for TokenRejection {
    fn from(rejection: JsonRejection) -> Self {
        Self(rejection.into())
    }
}

impl IntoResponse for TokenRejection {
    fn into_response(self) -> Response {
        log_if_fault(&self.0);
        let body = LoginResponse {
            user_id: None,
            token: None,
            refresh_token: None,
            result: false,
            errors: self.0.messages(),
        };
        (status_for(&self.0), Json(body)).into_response()
    }
}

/// Response for logout
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/auth/register", post(register_handler))
        .route(
            "/auth/register-admin/{invite_key}",
            post(register_admin_invite_handler),
        )
        .route("/auth/register-admin", post(register_admin_caller_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/generate-token", post(generate_token_handler))
        .route("/auth/logout", post(logout_handler))
        .route(
            "/auth/update-user-details",
            post(update_user_details_handler),
        )
        .route("/health", get(health_handler))
        .with_state(state)
}

/// POST /auth/register
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, RegisterRejection>,
) -> Result<Json<RegisterResponse>, RegisterRejection> {
    tracing::info!("Registration attempt for email: {}", request.email);

    let user = state.auth_service.register(request).await?;

    tracing::info!("User registered successfully: {}", user.email);
    Ok(Json(user.into()))
}

/// POST /auth/register-admin/{invite_key}
async fn register_admin_invite_handler(
    State(state): State<Arc<AuthApiState>>,
    Path(invite_key): Path<String>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, RegisterRejection>,
) -> Result<Json<RegisterResponse>, RegisterRejection> {
    tracing::info!("Admin registration attempt for email: {}", request.email);

    let user = state
        .auth_service
        .register_admin(request, AdminGrant::Invite(invite_key))
        .await?;

    tracing::info!("Administrator registered: {}", user.email);
    Ok(Json(user.into()))
}

/// POST /auth/register-admin
/// Caller must hold the Administrator role
async fn register_admin_caller_handler(
    State(state): State<Arc<AuthApiState>>,
    caller: AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, RegisterRejection>,
) -> Result<Json<RegisterResponse>, RegisterRejection> {
    tracing::info!(
        "Admin registration for {} requested by {}",
        request.email,
        caller.user_id
    );

    let user = state
        .auth_service
        .register_admin(request, AdminGrant::Caller(caller.user_id))
        .await?;

    tracing::info!("Administrator registered: {}", user.email);
    Ok(Json(user.into()))
}

/// POST /auth/login
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, TokenRejection>,
) -> Result<Json<LoginResponse>, TokenRejection> {
    tracing::info!("Login attempt for email: {}", request.email);

    let pair = state.auth_service.login(request).await?;

    tracing::info!("User logged in successfully: {}", pair.user_id);
    Ok(Json(pair.into()))
}

/// POST /auth/generate-token
async fn generate_token_handler(
    State(state): State<Arc<AuthApiState>>,
    WithRejection(Json(request), _): WithRejection<Json<TokenRequest>, TokenRejection>,
) -> Result<Json<LoginResponse>, TokenRejection> {
    tracing::debug!("Token refresh request for user: {}", request.user_id);

    let pair = state.auth_service.refresh_session(request).await?;
    Ok(Json(pair.into()))
}

/// POST /auth/logout
async fn logout_handler(
    State(state): State<Arc<AuthApiState>>,
    user: AuthenticatedUser,
) -> Result<Json<LogoutResponse>, AuthError> {
    tracing::info!("Logout request for user: {}", user.user_id);

    let success = state.auth_service.logout(user.user_id).await?;

    Ok(Json(LogoutResponse {
        success,
        message: "Logged out successfully".to_string(),
    }))
}

/// POST /auth/update-user-details
async fn update_user_details_handler(
    State(state): State<Arc<AuthApiState>>,
    user: AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<UpdateUserDetailsRequest>, AuthError>,
) -> Result<Json<UserResponse>, AuthError> {
    let updated = state
        .auth_service
        .update_user_details(user.user_id, request)
        .await?;

    tracing::info!("Updated details for user: {}", user.user_id);
    Ok(Json(updated))
}

/// GET /health
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
