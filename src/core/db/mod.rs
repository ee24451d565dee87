//! Database module for the auth service
//!
//! This module provides the store traits the auth layer depends on, their
//! PostgreSQL (SQLx) and in-memory implementations, models and pool setup.

pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;
pub mod store;

// Re-export commonly used items
pub use memory::{MemoryIdentityStore, MemoryTokenStore};
pub use models::*;
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations, health_check};
pub use repositories::{RefreshTokenRepository, UserRepository};
pub use store::{IdentityStore, StoreError, StoreResult, TokenStore};

// Re-export sqlx types that might be needed
pub use sqlx::PgPool;
