//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An application backed by the in-memory repository
//! - A temporary upload directory per test
//! - Account creation and login helpers
//! - Request helpers returning status, headers and JSON body

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use couchsport_api::app::{build_router, AppState};
use couchsport_api::config::Config;
use couchsport_shared::auth::password::hash_password;
use couchsport_shared::db::memory::MemoryRepository;
use couchsport_shared::db::repository::UserRepository;
use couchsport_shared::images::storage::LocalFileStore;
use couchsport_shared::models::profile::Profile;
use couchsport_shared::models::user::{CreateUser, User};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::Service as _;

pub const PASSWORD: &str = "correct horse battery";

/// Test context containing all necessary resources
pub struct TestContext {
    pub repo: Arc<MemoryRepository>,
    pub app: axum::Router,
    pub config: Config,
    pub uploads: TempDir,
}

/// A registered account with its session cookie
pub struct Account {
    pub user: User,
    pub profile: Profile,
    pub cookie: String,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    /// Creates a new test context with an empty repository
    pub async fn new() -> Self {
        let uploads = tempfile::tempdir().expect("Failed to create upload dir");
        let uploads_dir = uploads.path().to_string_lossy().to_string();
        let config = Config::for_tests(&uploads_dir);

        let repo = Arc::new(MemoryRepository::new());
        let files = LocalFileStore::new(&config.uploads.dir, &config.uploads.url_prefix)
            .await
            .expect("Failed to create file store");

        let state = AppState::new(repo.clone(), Arc::new(files), config.clone());
        let app = build_router(state);

        TestContext {
            repo,
            app,
            config,
            uploads,
        }
    }

    /// Creates a user and profile directly in the repository
    pub async fn create_user(&self, email: &str) -> (User, Profile) {
        self.repo
            .create_user_with_profile(CreateUser {
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).expect("Failed to hash password"),
            })
            .await
            .expect("Failed to create user")
    }

    /// Creates a user and logs it in
    pub async fn account(&self, email: &str) -> Account {
        let (user, profile) = self.create_user(email).await;

        let response = self
            .post("/login", None, serde_json::json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);

        let cookie = session_cookie(&response.headers).expect("login sets a session cookie");
        Account {
            user,
            profile,
            cookie,
        }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.expect("Router failed");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.post_raw(uri, cookie, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, cookie: Option<&str>, body: String) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }
}

/// `name=value` of the session cookie set by a response
pub fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("couchsport_session="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Smallest byte string the PNG classifier accepts
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 24]);
    bytes
}

pub fn png_data_url() -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png_bytes()))
}

/// Inline upload entry of a page payload
pub fn upload(filename: &str) -> Value {
    serde_json::json!({ "file": png_data_url(), "filename": filename })
}
