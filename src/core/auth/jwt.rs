//! JWT utilities for access token encoding and validation
//!
//! Access tokens are HS256-signed and carry issuer, audience, the user's email
//! as subject, a `uid` claim, roles and any custom claims stored for the user.
//!
//! Two decode paths exist:
//! - [`JwtService::validate_token`] checks signature, expiry (no leeway), issuer and audience.
//!   Used for bearer authentication.
//! - [`JwtService::decode_for_refresh`] only parses the token (optionally checking the
//!   signature). The refresh pipeline checks issuer and audience itself and anchors trust
//!   in the stored refresh-token row.

use std::collections::BTreeMap;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default access token expiration time (15 minutes)
pub const DEFAULT_ACCESS_TOKEN_EXPIRATION_MINUTES: i64 = 15;

pub const DEFAULT_ISSUER: &str = "auth-api";
pub const DEFAULT_AUDIENCE: &str = "auth-api-clients";

/// Secret used by debug builds when JWT_SECRET is not set
pub const DEV_SECRET: &str = "auth_api_dev_secret_key_not_for_production_32chars";

/// Claim names owned by the token itself. Custom claims may not override them.
pub const REGISTERED_CLAIMS: &[&str] = &[
    "sub", "jti", "email", "uid", "iss", "aud", "iat", "exp", "nbf", "roles",
];

/// JWT configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token issuer
    pub issuer: String,
    /// Token audience
    pub audience: String,
    /// Access token expiration in minutes
    pub access_token_expiration_minutes: i64,
    /// Require a valid signature on the access token presented for refresh
    pub verify_signature_on_refresh: bool,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field(
                "access_token_expiration_minutes",
                &self.access_token_expiration_minutes,
            )
            .field(
                "verify_signature_on_refresh",
                &self.verify_signature_on_refresh,
            )
            .finish()
    }
}

impl JwtConfig {
    /// Create a new JWT configuration
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            access_token_expiration_minutes: DEFAULT_ACCESS_TOKEN_EXPIRATION_MINUTES,
            verify_signature_on_refresh: false,
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Result<Self, JwtError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from a variable lookup (environment or test map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, JwtError> {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(JwtError::MissingSecret)?;

        let mut config = Self::new(secret);

        if let Some(issuer) = lookup("JWT_ISSUER") {
            config.issuer = issuer;
        }
        if let Some(audience) = lookup("JWT_AUDIENCE") {
            config.audience = audience;
        }
        if let Some(minutes) = lookup("JWT_DURATION_IN_MINUTES").and_then(|v| v.parse().ok()) {
            config.access_token_expiration_minutes = minutes;
        }
        if let Some(strict) = lookup("JWT_VERIFY_SIGNATURE_ON_REFRESH") {
            config.verify_signature_on_refresh = matches!(
                strict.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        Ok(config)
    }

    /// Set access token expiration
    pub fn access_token_expiration(mut self, minutes: i64) -> Self {
        self.access_token_expiration_minutes = minutes;
        self
    }

    /// Set issuer
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Set audience
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Require signature verification during refresh
    pub fn verify_signature_on_refresh(mut self, verify: bool) -> Self {
        self.verify_signature_on_refresh = verify;
        self
    }
}

/// JWT errors
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT_SECRET environment variable not set")]
    MissingSecret,

    #[error("Token encoding failed: {0}")]
    EncodingError(String),

    #[error("Token decoding failed: {0}")]
    DecodingError(String),

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Invalid audience")]
    InvalidAudience,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
            ErrorKind::InvalidAudience => JwtError::InvalidAudience,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                JwtError::InvalidToken
            }
            _ => JwtError::DecodingError(err.to_string()),
        }
    }
}

/// `aud` claim: a single string or a list of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::Single(value) => value == audience,
            Audience::Many(values) => values.iter().any(|v| v == audience),
        }
    }
}

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// JWT ID, bound to the refresh-token row issued alongside
    pub jti: String,
    pub email: String,
    /// User ID
    pub uid: String,
    pub iss: String,
    pub aud: Audience,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Custom claims stored for the user
    #[serde(flatten)]
    pub custom: BTreeMap<String, serde_json::Value>,
}

impl Claims {
    /// Get user ID as UUID
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.uid).map_err(|_| JwtError::InvalidToken)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// JWT service for token operations
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    /// Create a new JWT service
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Create JWT service from environment variables
    pub fn from_env() -> Result<Self, JwtError> {
        let config = JwtConfig::from_env()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &JwtConfig {
        &self.config
    }

    /// Sign claims into a compact HS256 token
    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validate and decode a bearer token: signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        // Set leeway to 0 for strict expiration checking
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }

    /// Decode an access token presented for refresh.
    ///
    /// Expiry, issuer and audience are never checked here. The signature is
    /// checked only when `verify_signature_on_refresh` is set.
    pub fn decode_for_refresh(&self, token: &str) -> Result<Claims, JwtError> {
        if !self.config.verify_signature_on_refresh {
            let token_data = jsonwebtoken::dangerous::insecure_decode::<Claims>(token)?;
            return Ok(token_data.claims);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(token_data.claims)
    }
}
