//! API route handlers
//!
//! This module contains all route handlers organized by resource:
//!
//! - `health`: Health check endpoint
//! - `auth`: Sign-up, login and logout
//! - `pages`: Page listing and lifecycle
//! - `profiles`: The caller's profile
//! - `images`: Image removal
//! - `activities`: Activity catalogue

pub mod activities;
pub mod auth;
pub mod health;
pub mod images;
pub mod pages;
pub mod profiles;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `{"Result": bool}` body of the mutating endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultResponse {
    #[serde(rename = "Result")]
    pub result: bool,
}

impl ResultResponse {
    pub fn new(result: bool) -> Self {
        Self { result }
    }
}

/// Body naming a single resource by id
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct IdRequest {
    pub id: Uuid,
}
