//! Authentication module
//!
//! This module provides authentication functionality including:
//! - JWT access token generation and validation
//! - Customer and administrator registration, login and logout
//! - Refresh-token rotation bound to the access token `jti`
//! - REST API endpoints for auth operations

pub mod api;
pub mod error;
pub mod extractors;
pub mod issuer;
pub mod jwt;
pub mod rotation;
pub mod service;

pub use api::{AuthApiState, auth_api_router};
pub use error::AuthError;
pub use extractors::AuthenticatedUser;
pub use issuer::{TokenIssuer, TokenPair};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService};
pub use rotation::TokenRotator;
pub use service::{
    AdminGrant, AuthService, LoginRequest, RegisterRequest, TokenRequest,
    UpdateUserDetailsRequest,
};
