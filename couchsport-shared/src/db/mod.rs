//! Database layer for Couchsport
//!
//! # Modules
//!
//! - `pool`: PostgreSQL connection pool with health checks
//! - `migrations`: Embedded migration runner
//! - `error`: [`StoreError`](error::StoreError) classification of storage failures
//! - `repository`: Repository traits the services depend on
//! - `postgres`: PostgreSQL implementation
//! - `memory`: In-memory implementation for tests and local development
//!
//! # Example
//!
//! ```no_run
//! use couchsport_shared::db::pool::{create_pool, DatabaseConfig};
//! use couchsport_shared::db::migrations::run_migrations;
//! use couchsport_shared::db::postgres::PgRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig {
//!         url: std::env::var("DATABASE_URL")?,
//!         ..Default::default()
//!     };
//!
//!     let pool = create_pool(config).await?;
//!     run_migrations(&pool).await?;
//!     let repo = PgRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod repository;
