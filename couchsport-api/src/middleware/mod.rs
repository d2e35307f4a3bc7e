//! Middleware modules for the API server
//!
//! Session authentication lives in `couchsport_shared::auth::middleware`;
//! this module holds the HTTP-only concerns.
//!
//! - `security`: Security response headers

pub mod security;
