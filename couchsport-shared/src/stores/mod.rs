//! Domain stores
//!
//! Stores sit between the HTTP handlers and the [`Repository`](crate::db::repository::Repository):
//! they own the multi-step operations that touch more than one table or
//! external storage.
//!
//! - [`page`]: page lifecycle and image ingestion

pub mod page;
