/// Profile endpoints
///
/// # Endpoints
///
/// - `GET /profiles/mine` - The caller's profile
/// - `POST /profiles/update` - Update the caller's profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use couchsport_shared::{
    auth::{authorization::require_profile_owner, middleware::AuthContext},
    models::profile::{Profile, ProfilePayload},
};
use tracing::info;
use validator::Validate;

/// The caller's profile
///
/// # Errors
///
/// - `422 Unprocessable Entity`: The caller has no profile
pub async fn my_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .repo
        .find_profile_by_owner(auth.user_id)
        .await?
        .ok_or_else(|| ApiError::Unprocessable("No profile for this user".to_string()))?;

    Ok(Json(profile))
}

/// Update the caller's profile
///
/// Only the fields present in the body change; the owner never does.
///
/// # Endpoint
///
/// ```text
/// POST /profiles/update
/// Content-Type: application/json
///
/// {
///   "id": "uuid",
///   "username": "wavechaser",
///   "city": "Biarritz"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid body, or the caller has no profile
/// - `403 Forbidden`: The profile belongs to someone else
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<ProfilePayload>, JsonRejection>,
) -> ApiResult<Json<Profile>> {
    let Json(payload) = payload?;
    payload.validate()?;

    require_profile_owner(state.repo.as_ref(), auth.user_id, payload.id).await?;

    let profile = state
        .repo
        .update_profile(payload.id, payload.changes)
        .await?
        .ok_or_else(|| ApiError::Unprocessable(format!("Profile {} not found", payload.id)))?;

    info!(user_id = %auth.user_id, profile_id = %profile.id, "Profile updated");
    Ok(Json(profile))
}
