/// Page endpoints
///
/// Listing is public. Every other endpoint runs behind the session
/// middleware, and every mutation checks page ownership before touching
/// anything.
///
/// # Endpoints
///
/// - `GET /pages?id=&owner_id=&followers&profile` - List pages
/// - `GET /pages/mine` - Pages of the caller's profile
/// - `POST /pages/new` - Create a page
/// - `POST /pages/update` - Update a page
/// - `POST /pages/publish` - Set the public flag
/// - `POST /pages/delete` - Delete a page

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{IdRequest, ResultResponse},
};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use couchsport_shared::{
    auth::{
        authorization::{get_profile_id, require_page_owner},
        middleware::AuthContext,
    },
    models::page::{Page, PageFilter, PagePayload},
};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

/// Publish request
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    /// Page ID
    pub id: Uuid,

    /// New value of the public flag
    pub public: bool,
}

/// List pages
///
/// Images and activities are always included. `followers` adds the
/// follower profiles and `profile` adds the owner profile; unknown keys
/// are ignored.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: `id` or `owner_id` is not a UUID
/// - `500 Internal Server Error`: Server error
pub async fn list_pages(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Page>>> {
    let filter = PageFilter::from_query(&query)?;
    let pages = state.pages.all(&filter).await.map_err(|e| {
        ApiError::InternalError(format!("Listing pages failed: {}", e))
    })?;

    debug!(count = pages.len(), "Listed pages");
    Ok(Json(pages))
}

/// Pages owned by the caller
///
/// # Errors
///
/// - `422 Unprocessable Entity`: The caller has no profile
pub async fn my_pages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Page>>> {
    let profile_id = get_profile_id(state.repo.as_ref(), auth.user_id).await?;

    let pages = state
        .pages
        .get_pages_by_owner_id(profile_id)
        .await
        .map_err(|e| ApiError::InternalError(format!("Listing pages failed: {}", e)))?;

    Ok(Json(pages))
}

/// Create a page owned by the caller's profile
///
/// Inline images are ingested; at most six valid images are kept.
///
/// # Endpoint
///
/// ```text
/// POST /pages/new
/// Content-Type: application/json
///
/// {
///   "name": "Hossegor",
///   "description": "Couch two minutes from the beach",
///   "couch_number": 2,
///   "images": [{ "file": "data:image/png;base64,...", "filename": "spot.png" }],
///   "activities": [{ "id": "uuid" }]
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid body or the caller has no profile
/// - `400 Bad Request`: Rejected image or the page could not be saved
pub async fn create_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<PagePayload>, JsonRejection>,
) -> ApiResult<Json<Page>> {
    let Json(payload) = payload?;
    payload.validate()?;

    let profile_id = get_profile_id(state.repo.as_ref(), auth.user_id).await?;
    let page = state.pages.create(profile_id, payload).await?;

    Ok(Json(page))
}

/// Update a page the caller owns
///
/// A non-empty `images` list replaces the gallery; the `activities` list
/// becomes the page's exact set of activities, none when omitted.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid body, missing id or unknown page
/// - `403 Forbidden`: The caller does not own the page
/// - `400 Bad Request`: Rejected image or the page could not be saved
pub async fn update_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<PagePayload>, JsonRejection>,
) -> ApiResult<Json<Page>> {
    let Json(payload) = payload?;
    payload.validate()?;

    let page_id = payload
        .id
        .ok_or_else(|| ApiError::invalid_field("id", "Page id is required"))?;
    require_page_owner(state.repo.as_ref(), auth.user_id, page_id).await?;

    let page = state.pages.update(auth.user_id, payload).await?;
    Ok(Json(page))
}

/// Set the public flag of a page the caller owns
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid body or unknown page
/// - `403 Forbidden`: The caller does not own the page
/// - `400 Bad Request`: The flag could not be saved
pub async fn publish_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<PublishRequest>, JsonRejection>,
) -> ApiResult<Json<ResultResponse>> {
    let Json(req) = payload?;
    require_page_owner(state.repo.as_ref(), auth.user_id, req.id).await?;

    let result = state.pages.publish(auth.user_id, req.id, req.public).await?;
    Ok(Json(ResultResponse::new(result)))
}

/// Delete a page the caller owns
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid body or unknown page
/// - `403 Forbidden`: The caller does not own the page
/// - `400 Bad Request`: The page could not be deleted
pub async fn delete_page(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Json<ResultResponse>> {
    let Json(req) = payload?;
    require_page_owner(state.repo.as_ref(), auth.user_id, req.id).await?;

    let result = state.pages.delete(auth.user_id, req.id).await?;
    Ok(Json(ResultResponse::new(result)))
}
