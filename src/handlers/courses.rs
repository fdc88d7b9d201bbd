use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::content::{NewContent, NewLesson, NewModule, COURSES};
use crate::error::ApiError;
use crate::identity::PermissionLevel;
use crate::middleware::CurrentPrincipal;
use crate::policy;
use crate::state::AppState;

use super::view_response;

/// GET /api/courses
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
) -> Result<Json<Value>, ApiError> {
    let items = state.content.list(COURSES, principal.as_ref()).await?;
    Ok(Json(json!({ "success": true, "data": items })))
}

/// GET /api/courses/:slug
pub async fn detail(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let view = state
        .content
        .detail(COURSES, principal.as_ref(), &slug)
        .await?;
    view_response(view)
}

/// POST /api/courses - create (authors and up)
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(input): Json<NewContent>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    let created = state.content.create(COURSES, author, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

/// POST /api/courses/:id/modules - module slug is scoped to the course
pub async fn create_module(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(course_id): Path<Uuid>,
    Json(input): Json<NewModule>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    let created = state
        .content
        .create_module(author, course_id, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

/// POST /api/modules/:id/lessons - lesson slug is scoped to the module
pub async fn create_lesson(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(module_id): Path<Uuid>,
    Json(input): Json<NewLesson>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    let created = state
        .content
        .create_lesson(author, module_id, input)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}
