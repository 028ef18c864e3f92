//! # BITSA Shared Library
//!
//! This crate contains the domain types, persistence, and authentication
//! logic used by the BITSA API server and its admin CLI.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, blog posts, events, photos) and the
//!   event attendance engine
//! - `auth`: Passwords, JWT tokens, request authentication, the
//!   authorization policy, and login identity resolution
//! - `db`: Connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the BITSA shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
