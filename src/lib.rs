//! Auth API - authentication backend
//!
//! Customer and administrator registration, password login, JWT access tokens
//! and single-use refresh tokens rotated per user.

pub mod core;
