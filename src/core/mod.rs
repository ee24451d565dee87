//! Core domain: identity storage, token issuance and the HTTP surface

pub mod auth;
pub mod config;
pub mod db;
pub mod validation;
