use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::content::{ContentPatch, NewContent, ARTICLES};
use crate::error::ApiError;
use crate::identity::PermissionLevel;
use crate::middleware::CurrentPrincipal;
use crate::policy;
use crate::state::AppState;

use super::view_response;

/// GET /api/articles - list with per-caller visibility
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
) -> Result<Json<Value>, ApiError> {
    let items = state.content.list(ARTICLES, principal.as_ref()).await?;
    Ok(Json(json!({ "success": true, "data": items })))
}

/// GET /api/articles/:slug - full detail when the caller may see it
pub async fn detail(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(slug): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let view = state
        .content
        .detail(ARTICLES, principal.as_ref(), &slug)
        .await?;
    view_response(view)
}

/// POST /api/articles - create (authors and up)
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Json(input): Json<NewContent>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    let created = state.content.create(ARTICLES, author, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

/// PUT /api/articles/:id - partial update; the slug never changes
pub async fn update(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ContentPatch>,
) -> Result<Json<Value>, ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    let updated = state.content.update(ARTICLES, author, id, patch).await?;
    Ok(Json(json!({ "success": true, "data": updated })))
}

/// DELETE /api/articles/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(CurrentPrincipal(principal)): Extension<CurrentPrincipal>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let author = policy::require(principal.as_ref(), PermissionLevel::Author)?;
    state.content.delete(ARTICLES, author, id).await?;
    Ok(Json(json!({ "success": true })))
}
