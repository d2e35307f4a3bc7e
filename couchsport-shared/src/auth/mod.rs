//! Authentication and authorization
//!
//! # Modules
//!
//! - [`password`]: Argon2id credential hashing and verification
//! - [`session`]: Opaque-token sessions carried in an HttpOnly cookie
//! - [`middleware`]: Axum middleware resolving the session into an [`AuthContext`](middleware::AuthContext)
//! - [`authorization`]: Profile and page ownership checks
//!
//! # Example
//!
//! ```no_run
//! use couchsport_shared::auth::password::{hash_password, verify_password};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hash = hash_password("user_password")?;
//! assert!(verify_password("user_password", &hash));
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod middleware;
pub mod password;
pub mod session;
