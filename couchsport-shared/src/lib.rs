//! # Couchsport Shared Library
//!
//! Domain types, persistence and business logic used by the Couchsport API
//! server.
//!
//! ## Module Organization
//!
//! - `models`: Database rows and request payloads
//! - `db`: Connection pool, migrations and repository implementations
//! - `auth`: Passwords, sessions, middleware and ownership checks
//! - `images`: Decoding, classification and storage of uploaded images
//! - `stores`: Page lifecycle orchestration

pub mod auth;
pub mod db;
pub mod images;
pub mod models;
pub mod stores;

/// Current version of the Couchsport shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
