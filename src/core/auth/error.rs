//! Authentication error types

use crate::core::auth::jwt::JwtError;
use crate::core::db::StoreError;

/// Authentication error types
///
/// Everything except `Unauthenticated`, `StoreFailure` and `Internal` is a
/// client-fault business failure carrying user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Malformed request body; one message per violated rule
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// Identity store refused to create the account
    #[error("{}", .0.join("; "))]
    IdentityCreation(Vec<String>),

    #[error("Invalid Authentication")]
    InvalidAuthentication,

    #[error("Invalid Token")]
    InvalidToken,

    #[error("Invalid Refresh Token")]
    InvalidRefreshToken,

    #[error("Refresh Token Expired")]
    RefreshTokenExpired,

    #[error("{0}")]
    Authorization(String),

    #[error("User not found")]
    UserNotFound,

    /// Missing or invalid bearer credential on an authenticated endpoint
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Store failure: {0}")]
    StoreFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Messages reported to the client
    pub fn messages(&self) -> Vec<String> {
        match self {
            AuthError::Validation(messages) | AuthError::IdentityCreation(messages) => {
                messages.clone()
            }
            AuthError::StoreFailure(_) | AuthError::Internal(_) => {
                vec!["An unexpected error occurred".to_string()]
            }
            other => vec![other.to_string()],
        }
    }

    /// Whether this is a server fault rather than a rejected request
    pub fn is_server_fault(&self) -> bool {
        matches!(self, AuthError::StoreFailure(_) | AuthError::Internal(_))
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(messages) => AuthError::IdentityCreation(messages),
            StoreError::UserNotFound => AuthError::UserNotFound,
            _ => AuthError::StoreFailure(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::MissingSecret | JwtError::EncodingError(_) => {
                AuthError::Internal(err.to_string())
            }
            _ => AuthError::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::InvalidAuthentication.to_string(),
            "Invalid Authentication"
        );
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid Token");
        assert_eq!(
            AuthError::InvalidRefreshToken.to_string(),
            "Invalid Refresh Token"
        );
        assert_eq!(
            AuthError::RefreshTokenExpired.to_string(),
            "Refresh Token Expired"
        );
        assert_eq!(
            AuthError::Authorization("Invalid Secret Key".to_string()).to_string(),
            "Invalid Secret Key"
        );
    }

    #[test]
    fn test_messages_hide_server_faults() {
        let err = AuthError::StoreFailure("connection refused".to_string());

        assert!(err.is_server_fault());
        assert_eq!(err.messages(), vec!["An unexpected error occurred"]);
    }

    #[test]
    fn test_messages_pass_validation_through() {
        let err = AuthError::Validation(vec!["a".to_string(), "b".to_string()]);

        assert!(!err.is_server_fault());
        assert_eq!(err.messages(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_store_error() {
        let err: AuthError = StoreError::Rejected(vec!["taken".to_string()]).into();
        assert!(matches!(err, AuthError::IdentityCreation(m) if m == vec!["taken"]));

        let err: AuthError = StoreError::UserNotFound.into();
        assert!(matches!(err, AuthError::UserNotFound));

        let err: AuthError = StoreError::Hashing("boom".to_string()).into();
        assert!(matches!(err, AuthError::StoreFailure(_)));
    }

    #[test]
    fn test_from_jwt_error() {
        let err: AuthError = JwtError::InvalidToken.into();
        assert!(matches!(err, AuthError::InvalidToken));

        let err: AuthError = JwtError::Expired.into();
        assert!(matches!(err, AuthError::InvalidToken));

        let err: AuthError = JwtError::EncodingError("bad key".to_string()).into();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
