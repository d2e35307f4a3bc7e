/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; library errors convert with
/// `?` and land on the status code their cause calls for:
///
/// | Cause | Status |
/// |---|---|
/// | malformed body, invalid fields, unresolvable profile/page | 422 |
/// | missing or expired session, bad credentials | 401 |
/// | authenticated but not the owner | 403 |
/// | rejected image payload, failed page mutation | 400 |
/// | storage I/O, infrastructure failure | 500 |
///
/// # Example
///
/// ```
/// use couchsport_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler() -> ApiResult<Json<serde_json::Value>> {
///     let found = false;
///     if !found {
///         return Err(ApiError::Unprocessable("profile not found".to_string()));
///     }
///     Ok(Json(json!({ "Result": true })))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use couchsport_shared::{
    auth::{authorization::AuthzError, password::PasswordError, session::SessionError},
    db::error::StoreError,
    images::IngestError,
    models::page::FilterError,
    stores::page::PageError,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Unprocessable entity (422) - request refers to something that cannot be resolved
    Unprocessable(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::Unprocessable(msg) => write!(f, "Unprocessable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// A single-field validation failure
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable", msg, None)
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert field validation failures to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    }
}

/// Convert unreadable JSON bodies to API errors
impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::invalid_field("body", err.body_text())
    }
}

/// Convert page query key errors to API errors
impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::invalid_field(&err.key, err.to_string())
    }
}

/// Convert storage errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Conflict(msg) => {
                if msg.contains("email") {
                    ApiError::Conflict("Email already exists".to_string())
                } else {
                    ApiError::Conflict(msg)
                }
            }
            StoreError::Constraint(msg) => ApiError::BadRequest(msg),
            StoreError::Database(msg) => ApiError::InternalError(format!("Database error: {}", msg)),
        }
    }
}

/// Convert session errors to API errors
impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => ApiError::Unauthorized("Session not found".to_string()),
            SessionError::Expired => ApiError::Unauthorized("Session expired".to_string()),
            SessionError::Store(err) => ApiError::InternalError(format!("Session storage error: {}", err)),
        }
    }
}

/// Convert authorization errors to API errors
///
/// A check that cannot be carried out is a 422; only a negative outcome is a 403.
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthorized => {
                ApiError::Forbidden("Not authorized to access this resource".to_string())
            }
            AuthzError::Store(err) => {
                tracing::warn!(error = %err, "Ownership check failed");
                ApiError::Unprocessable("Could not verify ownership".to_string())
            }
            other => ApiError::Unprocessable(other.to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert image ingestion errors to API errors
impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Storage(err) => ApiError::InternalError(format!("Image storage error: {}", err)),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// Convert page store errors to API errors
impl From<PageError> for ApiError {
    fn from(err: PageError) -> Self {
        match err {
            PageError::Ingest(err) => err.into(),
            PageError::Store(err) => {
                tracing::warn!(error = %err, "Page store failure");
                ApiError::BadRequest("The page could not be saved".to_string())
            }
            PageError::NotFound(id) => ApiError::Unprocessable(format!("Page {} not found", id)),
            PageError::MissingId => ApiError::invalid_field("id", "Page id is required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status(err: impl Into<ApiError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "email".to_string(),
                message: "Invalid email format".to_string(),
            },
            ValidationErrorDetail {
                field: "password".to_string(),
                message: "Password too short".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_session_errors_are_unauthorized() {
        assert_eq!(status(SessionError::NotFound), StatusCode::UNAUTHORIZED);
        assert_eq!(status(SessionError::Expired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(SessionError::Store(StoreError::Database("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_authz_errors() {
        assert_eq!(status(AuthzError::NotAuthorized), StatusCode::FORBIDDEN);
        assert_eq!(
            status(AuthzError::PageNotFound(Uuid::nil())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(AuthzError::ProfileNotFound(Uuid::nil())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_page_errors() {
        assert_eq!(
            status(PageError::Store(StoreError::Database("boom".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PageError::Ingest(IngestError::InvalidEncoding("bad".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PageError::Ingest(IngestError::Storage(std::io::Error::other("disk")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status(PageError::MissingId), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_store_conflict_on_email() {
        let err = ApiError::from(StoreError::Conflict("users_email_key".to_string()));
        assert!(matches!(err, ApiError::Conflict(msg) if msg == "Email already exists"));
    }
}
