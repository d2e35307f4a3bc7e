/// Session authentication middleware for Axum
///
/// Gates a router behind the session cookie: resolve the session, reject
/// it if expired (destroying it as a side effect), then hand the request to
/// the inner handler with an [`AuthContext`] in its extensions.
///
/// # Responses
///
/// - Missing cookie or unknown token: 401
/// - Expired session: 401, and the session row is deleted
/// - Storage failure: 500
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use couchsport_shared::auth::middleware::{create_session_middleware, AuthContext};
/// use couchsport_shared::auth::session::SessionStore;
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// fn router(sessions: SessionStore) -> Router {
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn(create_session_middleware(sessions)))
/// }
/// ```

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, error};
use uuid::Uuid;

use super::session::{SessionError, SessionStore};

/// Identity resolved from the session cookie
///
/// Handlers extract it with `Extension<AuthContext>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user
    pub user_id: Uuid,

    /// Session that authenticated the request
    pub session_id: Uuid,
}

/// Rejection produced by the session middleware
#[derive(Debug)]
pub enum AuthError {
    /// No cookie, or the token is unknown
    MissingSession,

    /// The session reached its expiry
    ExpiredSession,

    /// Storage failure while resolving the session
    Internal(String),
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => AuthError::MissingSession,
            SessionError::Expired => AuthError::ExpiredSession,
            SessionError::Store(e) => AuthError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSession => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::ExpiredSession => (StatusCode::UNAUTHORIZED, "Session expired"),
            AuthError::Internal(msg) => {
                error!(error = %msg, "Session lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({
            "error": if status == StatusCode::UNAUTHORIZED { "unauthorized" } else { "internal_error" },
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Session authentication middleware
///
/// # Errors
///
/// Returns `AuthError` (401/500) when the request cannot be authenticated
pub async fn session_auth_middleware(
    sessions: SessionStore,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let jar = CookieJar::from_headers(req.headers());

    let session = sessions.get_valid_session(&jar).await?;
    debug!(session_id = %session.id, user_id = %session.owner_id, "Session authenticated");

    req.extensions_mut().insert(AuthContext {
        user_id: session.owner_id,
        session_id: session.id,
    });

    Ok(next.run(req).await)
}

/// Creates a session middleware closure for `axum::middleware::from_fn`
pub fn create_session_middleware(
    sessions: SessionStore,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>> + Clone
{
    move |req, next| {
        let sessions = sessions.clone();
        Box::pin(session_auth_middleware(sessions, req, next))
    }
}
