//! Database models for Couchsport
//!
//! Each model owns its row type, its input types and the SQL that reads or
//! writes its table. Repositories compose these calls into transactions.
//!
//! # Models
//!
//! - `user`: Credential holders
//! - `profile`: User-facing profile, the owner of pages
//! - `session`: Server-side login sessions
//! - `page`: Page aggregate root, payloads and listing filter
//! - `image`: Page gallery images
//! - `activity`: Activity catalogue and page links
//!
//! # Example
//!
//! ```no_run
//! use couchsport_shared::models::user::{User, CreateUser};
//! use couchsport_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let user = User::create(&pool, CreateUser {
//!     email: "rider@example.com".to_string(),
//!     password_hash: "$argon2id$...".to_string(),
//! }).await?;
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod image;
pub mod page;
pub mod profile;
pub mod session;
pub mod user;
