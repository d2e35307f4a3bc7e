/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Sign-up
/// - Login
/// - Logout
///
/// # Endpoints
///
/// - `POST /signup` - Create an account and its profile
/// - `POST /login` - Verify credentials and set the session cookie
/// - `POST /logout` - Destroy the current session

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::ResultResponse,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use couchsport_shared::{
    auth::{middleware::AuthContext, password},
    models::user::CreateUser,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

/// Sign-up request
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Sign-up response
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    /// User ID
    pub id: Uuid,

    /// Email address
    pub email: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session token, also set as the session cookie
    #[serde(rename = "Token")]
    pub token: String,

    /// Email address of the logged-in user
    #[serde(rename = "Email")]
    pub email: String,
}

/// Create an account
///
/// Creates the user and its empty profile in one transaction.
///
/// # Endpoint
///
/// ```text
/// POST /signup
/// Content-Type: application/json
///
/// {
///   "email": "rider@example.com",
///   "password": "longenough"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
/// - `500 Internal Server Error`: Server error
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let (user, profile) = state
        .repo
        .create_user_with_profile(CreateUser {
            email: req.email,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, profile_id = %profile.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.id,
            email: user.email,
        }),
    ))
}

/// Login endpoint
///
/// Verifies the credentials, opens a session and sets the session cookie.
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// {
///   "email": "rider@example.com",
///   "password": "longenough"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "Token": "9f86d081...",
///   "Email": "rider@example.com"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unreadable body or unknown user
/// - `401 Unauthorized`: Wrong password, or the session could not be created
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<LoginResponse>)> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let user = state
        .repo
        .find_user_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Unknown user".to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash) {
        warn!(user_id = %user.id, "Login rejected: invalid credentials");
        return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
    }

    let issued = state.sessions.create(user.id).await.map_err(|e| {
        warn!(user_id = %user.id, error = %e, "Login rejected: session not created");
        ApiError::Unauthorized("Could not create session".to_string())
    })?;

    let cookie = state.sessions.create_cookie(&issued);
    info!(user_id = %user.id, session_id = %issued.session.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: issued.token,
            email: user.email,
        }),
    ))
}

/// Logout endpoint
///
/// Destroys the session behind the request cookie and clears the cookie.
///
/// # Errors
///
/// - `401 Unauthorized`: No valid session
/// - `500 Internal Server Error`: Session storage failure
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<ResultResponse>)> {
    let removed = state.sessions.destroy(&jar).await?;
    info!(user_id = %auth.user_id, session_id = %auth.session_id, removed, "User logged out");

    Ok((jar.add(state.sessions.removal_cookie()), Json(ResultResponse::new(removed))))
}
