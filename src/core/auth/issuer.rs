//! Token issuer
//!
//! Mints an access token for a user and the refresh-token row bound to it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::auth::error::AuthError;
use crate::core::auth::jwt::{Audience, Claims, JwtService, REGISTERED_CLAIMS};
use crate::core::db::{IdentityStore, RefreshToken, Role, TokenStore, User, UserClaim};

/// Refresh token lifetime, independent of the access token duration
pub const REFRESH_TOKEN_LIFETIME_MINUTES: i64 = 110;

/// Length of the opaque refresh token value
pub const REFRESH_TOKEN_LENGTH: usize = 23;

const REFRESH_TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_";

/// Access token plus the opaque refresh token issued alongside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Generate a refresh token value from the thread-local CSPRNG
pub fn generate_refresh_token_value() -> String {
    let mut rng = rand::thread_rng();
    (0..REFRESH_TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..REFRESH_TOKEN_ALPHABET.len());
            REFRESH_TOKEN_ALPHABET[idx] as char
        })
        .collect()
}

/// Build the access token claim set.
///
/// Registered claims always win over custom claims of the same name, and among
/// custom claims sharing a type the first one stored is kept. Roles are emitted
/// once each, in store order.
pub fn build_claims(
    user: &User,
    roles: &[Role],
    custom_claims: &[UserClaim],
    issuer: &str,
    audience: &str,
    now: DateTime<Utc>,
    expiration_minutes: i64,
) -> Claims {
    let mut custom = BTreeMap::new();
    for claim in custom_claims {
        if REGISTERED_CLAIMS.contains(&claim.claim_type.as_str()) {
            tracing::warn!(
                "Dropping custom claim '{}' for user {}: name is reserved",
                claim.claim_type,
                user.id
            );
            continue;
        }
        custom
            .entry(claim.claim_type.clone())
            .or_insert_with(|| serde_json::Value::String(claim.claim_value.clone()));
    }

    let mut role_names: Vec<String> = Vec::with_capacity(roles.len());
    for role in roles {
        let name = role.as_str().to_string();
        if !role_names.contains(&name) {
            role_names.push(name);
        }
    }

    Claims {
        sub: user.email.clone(),
        jti: Uuid::new_v4().to_string(),
        email: user.email.clone(),
        uid: user.id.to_string(),
        iss: issuer.to_string(),
        aud: Audience::Single(audience.to_string()),
        iat: now.timestamp(),
        exp: (now + Duration::minutes(expiration_minutes)).timestamp(),
        roles: role_names,
        custom,
    }
}

/// Token issuer
#[derive(Clone)]
pub struct TokenIssuer {
    jwt: JwtService,
    identity: Arc<dyn IdentityStore>,
    tokens: Arc<dyn TokenStore>,
}

impl TokenIssuer {
    pub fn new(
        jwt: JwtService,
        identity: Arc<dyn IdentityStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            jwt,
            identity,
            tokens,
        }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Mint an access token for `user` and replace the user's refresh-token row
    /// with a fresh one bound to the new `jti`.
    pub async fn issue_token_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let roles = self.identity.roles(user.id).await?;
        let custom_claims = self.identity.claims(user.id).await?;

        let config = self.jwt.config();
        let now = Utc::now();
        let claims = build_claims(
            user,
            &roles,
            &custom_claims,
            &config.issuer,
            &config.audience,
            now,
            config.access_token_expiration_minutes,
        );
        let access_token = self.jwt.encode(&claims)?;

        let row = RefreshToken {
            token: generate_refresh_token_value(),
            jwt_id: claims.jti,
            user_id: user.id,
            added_date: now,
            expire_date: now + Duration::minutes(REFRESH_TOKEN_LIFETIME_MINUTES),
        };
        let refresh_token = row.token.clone();
        self.tokens.replace_for_user(row).await?;

        tracing::debug!("Issued token pair for user {}", user.id);

        Ok(TokenPair {
            user_id: user.id,
            access_token,
            refresh_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::JwtConfig;
    use crate::core::db::{CreateUser, MemoryIdentityStore, MemoryTokenStore};

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "u@example.com".to_string(),
            first_name: "U".to_string(),
            last_name: "Ser".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn setup() -> (TokenIssuer, MemoryIdentityStore, MemoryTokenStore, User) {
        let identity = MemoryIdentityStore::new().bcrypt_cost(4);
        let tokens = MemoryTokenStore::new();
        let user = identity
            .create_user(CreateUser {
                email: "u@example.com".to_string(),
                password: "pw1234".to_string(),
                first_name: "U".to_string(),
                last_name: "Ser".to_string(),
            })
            .await
            .unwrap();
        identity.add_to_role(user.id, Role::Customer).await.unwrap();

        let issuer = TokenIssuer::new(
            JwtService::new(JwtConfig::new("issuer_test_secret")),
            Arc::new(identity.clone()),
            Arc::new(tokens.clone()),
        );
        (issuer, identity, tokens, user)
    }

    // ========================================================================
    // Refresh Token Value Tests
    // ========================================================================

    #[test]
    fn test_refresh_token_value_shape() {
        let value = generate_refresh_token_value();

        assert_eq!(value.len(), REFRESH_TOKEN_LENGTH);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }

    #[test]
    fn test_refresh_token_values_differ() {
        assert_ne!(generate_refresh_token_value(), generate_refresh_token_value());
    }

    // ========================================================================
    // Claim Building Tests
    // ========================================================================

    #[test]
    fn test_build_claims_core_fields() {
        let user = sample_user();
        let now = Utc::now();

        let claims = build_claims(&user, &[Role::Customer], &[], "iss", "aud", now, 15);

        assert_eq!(claims.sub, "u@example.com");
        assert_eq!(claims.email, "u@example.com");
        assert_eq!(claims.uid, user.id.to_string());
        assert_eq!(claims.iss, "iss");
        assert!(claims.aud.contains("aud"));
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.roles, vec!["Customer"]);
        assert!(Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn test_build_claims_fresh_jti_each_time() {
        let user = sample_user();
        let now = Utc::now();

        let a = build_claims(&user, &[], &[], "iss", "aud", now, 15);
        let b = build_claims(&user, &[], &[], "iss", "aud", now, 15);

        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_build_claims_custom_claim_precedence() {
        let user = sample_user();
        let custom = vec![
            UserClaim::new("tenant", "first"),
            UserClaim::new("tenant", "second"),
            UserClaim::new("sub", "spoofed@example.com"),
            UserClaim::new("roles", "Administrator"),
        ];

        let claims = build_claims(
            &user,
            &[Role::Customer],
            &custom,
            "iss",
            "aud",
            Utc::now(),
            15,
        );

        assert_eq!(claims.custom.get("tenant"), Some(&serde_json::json!("first")));
        assert_eq!(claims.sub, "u@example.com");
        assert_eq!(claims.roles, vec!["Customer"]);
        assert_eq!(claims.custom.len(), 1);
    }

    #[test]
    fn test_build_claims_roles_deduplicated() {
        let claims = build_claims(
            &sample_user(),
            &[Role::Administrator, Role::Customer, Role::Administrator],
            &[],
            "iss",
            "aud",
            Utc::now(),
            15,
        );

        assert_eq!(claims.roles, vec!["Administrator", "Customer"]);
    }

    // ========================================================================
    // Issuance Tests
    // ========================================================================

    #[tokio::test]
    async fn test_issue_token_pair_binds_row_to_jti() {
        let (issuer, _identity, tokens, user) = setup().await;

        let pair = issuer.issue_token_pair(&user).await.unwrap();

        let claims = issuer.jwt().validate_token(&pair.access_token).unwrap();
        let row = tokens.find_by_token(&pair.refresh_token).await.unwrap().unwrap();

        assert_eq!(row.user_id, user.id);
        assert_eq!(row.jwt_id, claims.jti);
        assert_eq!(
            row.expire_date - row.added_date,
            Duration::minutes(REFRESH_TOKEN_LIFETIME_MINUTES)
        );
        assert_eq!(claims.uid, user.id.to_string());
        assert!(claims.has_role("Customer"));
    }

    #[tokio::test]
    async fn test_issue_token_pair_replaces_previous_row() {
        let (issuer, _identity, tokens, user) = setup().await;

        let first = issuer.issue_token_pair(&user).await.unwrap();
        let second = issuer.issue_token_pair(&user).await.unwrap();

        assert_eq!(tokens.len(), 1);
        assert!(tokens.find_by_token(&first.refresh_token).await.unwrap().is_none());
        assert!(tokens.find_by_token(&second.refresh_token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_issue_token_pair_includes_custom_claims() {
        let (issuer, identity, _tokens, user) = setup().await;
        identity
            .add_claim(user.id, UserClaim::new("department", "billing"))
            .await
            .unwrap();

        let pair = issuer.issue_token_pair(&user).await.unwrap();
        let claims = issuer.jwt().validate_token(&pair.access_token).unwrap();

        assert_eq!(
            claims.custom.get("department"),
            Some(&serde_json::json!("billing"))
        );
    }

    #[test]
    fn test_token_pair_serialization_camel_case() {
        let pair = TokenPair {
            user_id: Uuid::nil(),
            access_token: "a.b.c".to_string(),
            refresh_token: "r".to_string(),
        };
        let json = serde_json::to_value(&pair).unwrap();

        assert_eq!(json["userId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(json["accessToken"], "a.b.c");
        assert_eq!(json["refreshToken"], "r");
    }
}
