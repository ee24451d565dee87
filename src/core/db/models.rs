//! Database models for the auth service
//!
//! This module defines the database entity structs that map to PostgreSQL tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// User Model
// ============================================================================

/// User entity representing a registered account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Email doubles as the user name and the access token subject
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User data for creation (password is plain text, the store hashes it)
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// User without sensitive data (for API responses)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

// ============================================================================
// Roles and Claims
// ============================================================================

/// Roles a user can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "Customer",
            Role::Administrator => "Administrator",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Customer" => Ok(Role::Customer),
            "Administrator" => Ok(Role::Administrator),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Custom claim attached to a user and copied into every access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserClaim {
    pub claim_type: String,
    pub claim_value: String,
}

impl UserClaim {
    pub fn new(claim_type: impl Into<String>, claim_value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            claim_value: claim_value.into(),
        }
    }
}

// ============================================================================
// Refresh Token Model
// ============================================================================

/// Persisted refresh token, bound to the `jti` of the access token it was issued with.
/// At most one row exists per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub jwt_id: String,
    pub user_id: Uuid,
    pub added_date: DateTime<Utc>,
    pub expire_date: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_date < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // ========================================================================
    // User Tests
    // ========================================================================

    #[test]
    fn test_user_serialization_skips_password_hash() {
        let json = serde_json::to_string(&sample_user()).unwrap();

        assert!(json.contains("ada@example.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$2b$04$hash"));
    }

    #[test]
    fn test_user_response_from_user() {
        let user = sample_user();
        let id = user.id;

        let response: UserResponse = user.into();

        assert_eq!(response.id, id);
        assert_eq!(response.full_name, "Ada Lovelace");
    }

    #[test]
    fn test_user_response_uses_camel_case() {
        let response: UserResponse = sample_user().into();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["lastName"], "Lovelace");
        assert_eq!(json["fullName"], "Ada Lovelace");
    }

    // ========================================================================
    // Role Tests
    // ========================================================================

    #[test]
    fn test_role_display_and_parse() {
        assert_eq!(Role::Customer.to_string(), "Customer");
        assert_eq!(Role::Administrator.to_string(), "Administrator");
        assert_eq!("Customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("Administrator".parse::<Role>().unwrap(), Role::Administrator);
        assert!("admin".parse::<Role>().is_err());
    }

    // ========================================================================
    // RefreshToken Tests
    // ========================================================================

    #[test]
    fn test_refresh_token_expiry() {
        let now = Utc::now();
        let token = RefreshToken {
            token: "abc".to_string(),
            jwt_id: "jti".to_string(),
            user_id: Uuid::new_v4(),
            added_date: now,
            expire_date: now + Duration::minutes(110),
        };

        assert!(!token.is_expired_at(now));
        assert!(!token.is_expired_at(now + Duration::minutes(110)));
        assert!(token.is_expired_at(now + Duration::minutes(111)));
        assert!(token.is_expired_at(now + Duration::minutes(200)));
    }
}
