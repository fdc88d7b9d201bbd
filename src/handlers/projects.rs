use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::content::{NewContent, PROJECTS};
use crate::error::ApiError;
use crate::identity::PermissionLevel;
use crate::middleware::CurrentPrincipal;
use crate::policy;
use crate::state::AppState;

use super::view_response;

/// GET /api/projects
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
) -> Result<Json<Value>, ApiError> {
    let items = state.content.list(PROJECTS, principal.as_ref()).await?;
    Ok(Json(json!({ "success": true, "data": items })))
}

/// GET /api/projects/:slug
pub async fn detail(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let view = state
        .content
        .detail(PROJECTS, principal.as_ref(), &slug)
        .await?;
    view_response(view)
}

/// POST /api/projects - create (authors and up)
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(input): Json<NewContent>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    let created = state.content.create(PROJECTS, author, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}
