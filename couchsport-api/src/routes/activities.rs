/// Activity catalogue
///
/// ```text
/// GET /activities
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use couchsport_shared::models::activity::Activity;

/// All activities, ordered by name
pub async fn list_activities(State(state): State<AppState>) -> ApiResult<Json<Vec<Activity>>> {
    Ok(Json(state.repo.list_activities().await?))
}
