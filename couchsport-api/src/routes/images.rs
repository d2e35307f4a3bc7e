/// Image endpoints
///
/// # Endpoints
///
/// - `POST /images/delete` - Remove one image from a page the caller owns

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{IdRequest, ResultResponse},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use couchsport_shared::{
    auth::{
        authorization::{require_page_owner, AuthzError},
        middleware::AuthContext,
    },
};

/// Remove an image
///
/// The stored file is left in place.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid body or unknown image
/// - `403 Forbidden`: The caller does not own the image's page
/// - `400 Bad Request`: The image could not be deleted
pub async fn delete_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Json<ResultResponse>> {
    let Json(req) = payload?;

    let image = state
        .repo
        .find_image(req.id)
        .await
        .map_err(AuthzError::from)?
        .ok_or(AuthzError::ImageNotFound(req.id))?;

    require_page_owner(state.repo.as_ref(), auth.user_id, image.page_id).await?;

    let result = state.pages.delete_image(auth.user_id, image.id).await?;
    Ok(Json(ResultResponse::new(result)))
}
