//! PostgreSQL repositories
//!
//! Repository implementations of the identity and token store traits.

pub mod refresh_token;
pub mod user;

pub use refresh_token::RefreshTokenRepository;
pub use user::UserRepository;
